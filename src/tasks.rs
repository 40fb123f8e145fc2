//! Background maintenance tasks.

use std::sync::Arc;
use std::time::Duration;

use taskhub_auth::SessionManager;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Periodically deletes expired or revoked refresh tokens and expired
/// blacklist entries. The first run happens one `interval` after spawning.
pub fn spawn_cleanup_task(sessions: Arc<SessionManager>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sessions.cleanup_expired().await {
                Ok(removed) => debug!(
                    refresh_tokens_removed = removed.refresh_tokens_removed,
                    blacklist_entries_removed = removed.blacklist_entries_removed,
                    "Scheduled session cleanup finished"
                ),
                Err(e) => warn!(error = %e, "Scheduled session cleanup failed"),
            }
        }
    })
}
