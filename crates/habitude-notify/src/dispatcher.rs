use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use habitude_db::Database;
use tracing::{info, warn};

use crate::Notifier;

/// Background task that fires habit reminders.
///
/// Runs on an interval; each tick is one dispatch cycle. All per-cycle
/// state is recomputed from the store, so restarts and multiple workers
/// are safe — the only memory between cycles is the `last_notified`
/// watermark persisted on each habit.
pub async fn run_reminder_loop(db: Arc<Database>, notifier: Arc<dyn Notifier>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let now = Local::now().naive_local();
        match dispatch_cycle(&db, notifier.as_ref(), now).await {
            Ok(sent) => {
                if sent > 0 {
                    info!("Reminder cycle: sent {} notifications", sent);
                }
            }
            Err(e) => {
                warn!("Reminder cycle error: {}", e);
            }
        }
    }
}

/// One dispatch cycle: scan due public habits and send one reminder per
/// habit. A missing chat id or a failed send is logged and skipped; the
/// rest of the cycle always runs.
pub async fn dispatch_cycle(
    db: &Database,
    notifier: &dyn Notifier,
    now: NaiveDateTime,
) -> anyhow::Result<usize> {
    let time_of_day = now.time().format("%H:%M:%S").to_string();
    let today = now.date().format("%Y-%m-%d").to_string();

    let due = db.due_habits(&time_of_day, &today)?;

    let mut sent = 0;
    for habit in due {
        let Some(chat_id) = habit.telegram_chat_id.as_deref() else {
            warn!("Habit {}: owner has no telegram chat id, skipping", habit.id);
            continue;
        };

        let text = format!(
            "Reminder: {} at {} in {}.",
            habit.action, habit.time, habit.place
        );

        match notifier.send(chat_id, &text).await {
            Ok(()) => {
                // The watermark is written only after a successful send,
                // so a failed delivery is retried on the next cycle.
                db.mark_notified(&habit.id, &today)?;
                sent += 1;
            }
            Err(e) => {
                warn!("Habit {}: failed to notify: {}", habit.id, e);
            }
        }
    }

    Ok(sent)
}
