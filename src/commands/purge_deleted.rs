use tracing::{info, warn};

use crate::App;

/// Hard-delete pastes whose soft deletion is older than the configured
/// retention window.
pub async fn run(app: App) -> anyhow::Result<()> {
    let Some(retention_secs) = app.config.paste.retention_secs else {
        warn!("no retention window configured, doing nothing");
        return Ok(());
    };

    let purged = app.database.purge_deleted_pastes(retention_secs).await?;
    if purged > 0 {
        info!("purged {purged} pastes");
    }

    Ok(())
}
