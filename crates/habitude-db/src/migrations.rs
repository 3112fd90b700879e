use crate::DbResult;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                TEXT PRIMARY KEY,
            email             TEXT NOT NULL UNIQUE,
            password          TEXT NOT NULL,
            telegram_chat_id  TEXT,
            city              TEXT,
            phone             TEXT,
            is_active         INTEGER NOT NULL DEFAULT 1,
            last_login        TEXT,
            created_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS habits (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            place            TEXT NOT NULL,
            time             TEXT NOT NULL,
            action           TEXT NOT NULL,
            is_pleasant      INTEGER NOT NULL DEFAULT 0,
            linked_habit_id  TEXT REFERENCES habits(id) ON DELETE SET NULL,
            periodicity      INTEGER NOT NULL,
            reward           TEXT,
            execution_time   INTEGER NOT NULL,
            is_public        INTEGER NOT NULL DEFAULT 0,
            last_notified    TEXT,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_habits_user
            ON habits(user_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_habits_public
            ON habits(is_public, time);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
