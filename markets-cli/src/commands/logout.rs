//! `schema-manager logout` - forget cached admin credentials.

use tracing::info;

use crate::auth::CredentialStore;
use crate::commands::Context;
use crate::error::CliResult;
use crate::output;

/// Run the logout command
pub async fn run(ctx: &Context) -> CliResult<()> {
    let store = ctx.credential_store();
    let existed = store.path().exists();
    store.clear()?;
    info!(path = %store.path().display(), "credential cache cleared");

    if existed {
        output::success("Cached credentials removed");
    } else {
        output::info("No cached credentials");
    }
    Ok(())
}
