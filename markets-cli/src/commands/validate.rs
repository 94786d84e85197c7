//! `schema-manager validate` - check the declared schema offline.

use markets_schema::validate_document;

use crate::cli::ValidateArgs;
use crate::commands::Context;
use crate::error::CliResult;
use crate::output;

/// Run the validate command
pub async fn run(ctx: &Context, args: ValidateArgs) -> CliResult<()> {
    output::header("Validate Schema");

    let loader = ctx.schema_loader(args.schema);
    output::kv("Schema", &loader.path().display().to_string());
    output::newline();

    let document = loader.load()?;
    validate_document(&document)?;

    output::success(&format!(
        "Schema is valid ({} collections, {} fields)",
        document.collections.len(),
        document.field_count()
    ));
    Ok(())
}
