//! `schema-manager seed` - insert reference rows.

use crate::commands::{Context, print_session};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::seed::{SEED_SETS, SeedRunner};

/// Run the seed command
pub async fn run(ctx: &Context) -> CliResult<()> {
    output::header("Seed Reference Data");
    output::kv("Target", &ctx.url);
    output::newline();

    let (client, session) = ctx.connect().await?;
    print_session(&session);

    for set in SEED_SETS {
        output::list_item(&format!("{} ({} rows)", set.collection, set.rows.len()));
    }
    output::newline();

    let report = SeedRunner::new(&client).run(SEED_SETS).await;

    if report.is_success() {
        output::success(&report.summary());
        Ok(())
    } else {
        output::warn(&report.summary());
        Err(CliError::Command(format!(
            "{} seed rows could not be inserted",
            report.failed
        )))
    }
}
