//! `schema-manager generate` - dump the live schema to disk.

use markets_migrate::Inspector;
use markets_schema::{DEFAULT_SCHEMA_VERSION, SchemaLoader};
use tracing::info;

use crate::cli::GenerateArgs;
use crate::commands::{Context, print_session};
use crate::error::CliResult;
use crate::output;

/// Run the generate command
pub async fn run(ctx: &Context, args: GenerateArgs) -> CliResult<()> {
    output::header("Generate Schema");
    output::kv("Target", &ctx.url);

    let output_path = args
        .output
        .unwrap_or_else(|| ctx.config.schema.generated_path.clone());
    output::kv("Output", &output_path.display().to_string());
    output::newline();

    output::step(1, 3, "Connecting...");
    let (client, session) = ctx.connect().await?;
    print_session(&session);

    output::step(2, 3, "Reading live collections...");
    let live = Inspector::new(&client).snapshot().await?;

    output::step(3, 3, "Writing schema...");
    let document = live.to_document(DEFAULT_SCHEMA_VERSION);
    SchemaLoader::new(&output_path).save(&document)?;

    info!(
        path = %output_path.display(),
        collections = live.len(),
        "wrote live schema"
    );
    output::newline();
    output::success(&format!(
        "Wrote {} collections to {}",
        live.len(),
        output_path.display()
    ));
    Ok(())
}
