//! `schema-manager apply` - bring the live backend in line with the declared schema.

use markets_migrate::{ApplyReport, ReconcileEngine};
use tracing::info;

use crate::cli::ApplyArgs;
use crate::commands::{Context, print_diff, print_session};
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the apply command
pub async fn run(ctx: &Context, args: ApplyArgs) -> CliResult<()> {
    output::header("Apply Schema");
    output::kv("Target", &ctx.url);
    output::newline();

    output::step(1, 4, "Validating declared schema...");
    let declared = ctx.load_declared(args.schema)?;

    output::step(2, 4, "Connecting...");
    let (client, session) = ctx.connect().await?;
    print_session(&session);

    output::step(3, 4, "Comparing with live state...");
    let mut engine = ReconcileEngine::new(&client);
    let plan = engine.plan(&declared).await?;
    output::newline();

    print_diff(&plan.diff);
    if plan.is_up_to_date() {
        info!("nothing to apply");
        return Ok(());
    }
    output::newline();

    if !args.yes && !output::confirm("Apply these changes?") {
        info!("apply declined by operator");
        output::warn("Aborted, nothing was changed");
        return Ok(());
    }

    output::step(4, 4, "Applying changes...");
    let report = engine.apply(&plan).await?;
    output::newline();
    print_report(&report);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::ApplyFailed {
            failed: report.failed.len(),
            total: report.succeeded.len() + report.failed.len(),
        })
    }
}

fn print_report(report: &ApplyReport) {
    for (kind, name) in &report.succeeded {
        output::success(&format!("{} {}", kind.as_str(), name));
    }
    for failure in &report.failed {
        output::error(&format!(
            "{} {}: {}",
            failure.kind.as_str(),
            failure.collection,
            failure.error
        ));
    }
    if !report.cycle.is_empty() {
        output::warn(&format!(
            "Relation cycle among new collections: {}",
            report.cycle.join(", ")
        ));
    }
    output::newline();
    output::info(&format!("{} ({} ms)", report.summary(), report.duration_ms));
}
