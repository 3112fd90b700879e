use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use habitude_db::Database;
use tracing::{info, warn};

const INACTIVITY_DAYS: i64 = 30;

/// Background task that deactivates accounts with no login in the last
/// 30 days. Deactivated users fail login until an operator intervenes.
pub async fn run_sweep_loop(db: Arc<Database>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let cutoff = (Utc::now() - chrono::Duration::days(INACTIVITY_DAYS))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        match db.deactivate_inactive_users(&cutoff) {
            Ok(count) => {
                if count > 0 {
                    info!("Sweep: deactivated {} inactive accounts", count);
                }
            }
            Err(e) => {
                warn!("Sweep error: {}", e);
            }
        }
    }
}
