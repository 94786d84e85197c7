//! `schema-manager setup` - manual setup instructions.

use crate::auth::session::{ADMIN_EMAIL_ENV, ADMIN_PASSWORD_ENV};
use crate::commands::Context;
use crate::error::CliResult;
use crate::output;

/// Run the setup command
pub async fn run(ctx: &Context) -> CliResult<()> {
    output::header("Backend Setup");

    output::section("1. Start the backend");
    output::code("./pocketbase serve");

    output::section("2. Create the first admin account");
    output::numbered_item(1, &format!("Open {}/_/ in a browser", ctx.url));
    output::numbered_item(2, "Create the admin account when prompted");
    output::newline();

    output::section("3. Provide credentials (optional)");
    output::code(&format!(
        "export {ADMIN_EMAIL_ENV}=admin@example.com\nexport {ADMIN_PASSWORD_ENV}=..."
    ));
    output::dim("Without them you are prompted once; credentials are cached for later runs.");
    output::newline();

    output::section("4. Apply the schema");
    output::code("schema-manager compare\nschema-manager apply\nschema-manager seed");

    output::kv("Declared schema", &ctx.config.schema.path.display().to_string());
    output::kv("Target", &ctx.url);
    Ok(())
}
