//! `schema-manager compare` - show what `apply` would change.

use markets_migrate::ReconcileEngine;
use tracing::info;

use crate::cli::CompareArgs;
use crate::commands::{Context, print_diff, print_session};
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the compare command
pub async fn run(ctx: &Context, args: CompareArgs) -> CliResult<()> {
    if !args.json {
        output::header("Compare Schema");
        output::kv("Target", &ctx.url);
    }

    let declared = ctx.load_declared(args.schema)?;
    let (client, session) = ctx.connect().await?;
    if !args.json {
        print_session(&session);
    }

    let mut engine = ReconcileEngine::new(&client);
    let plan = engine.plan(&declared).await?;
    info!(summary = %plan.diff.summary(), "compared declared schema with live state");

    if args.json {
        let json = serde_json::to_string_pretty(&plan.diff)
            .map_err(|e| CliError::Command(format!("failed to serialize diff: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    output::newline();
    print_diff(&plan.diff);
    if !plan.is_up_to_date() {
        output::newline();
        output::dim("Run `schema-manager apply` to apply these changes.");
    }
    Ok(())
}
