//! Database row and write types — these map directly to SQLite rows.
//! Distinct from the habitude-types API models to keep the DB layer
//! independent. Times are stored as `HH:MM:SS` text, dates as
//! `YYYY-MM-DD`, timestamps as SQLite's `datetime('now')` format.

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub telegram_chat_id: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct HabitRow {
    pub id: String,
    pub user_id: String,
    pub place: String,
    pub time: String,
    pub action: String,
    pub is_pleasant: bool,
    pub linked_habit_id: Option<String>,
    pub periodicity: u32,
    pub reward: Option<String>,
    pub execution_time: u32,
    pub is_public: bool,
    pub last_notified: Option<String>,
    pub created_at: String,
}

/// A complete habit record for insertion. Every write goes through the
/// rule validator before it reaches SQLite.
pub struct HabitWrite {
    pub place: String,
    pub time: String,
    pub action: String,
    pub is_pleasant: bool,
    pub linked_habit_id: Option<String>,
    pub periodicity: u32,
    pub reward: Option<String>,
    pub execution_time: u32,
    pub is_public: bool,
}

/// Field-level patch for updates. `None` keeps the stored value; the
/// nullable columns use a second `Option` so they can be cleared.
#[derive(Default)]
pub struct HabitPatch {
    pub place: Option<String>,
    pub time: Option<String>,
    pub action: Option<String>,
    pub is_pleasant: Option<bool>,
    pub linked_habit_id: Option<Option<String>>,
    pub periodicity: Option<u32>,
    pub reward: Option<Option<String>>,
    pub execution_time: Option<u32>,
    pub is_public: Option<bool>,
}

#[derive(Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

/// Row shape returned by the due-reminder scan: just enough to compose
/// and address one notification.
pub struct DueHabitRow {
    pub id: String,
    pub action: String,
    pub time: String,
    pub place: String,
    pub telegram_chat_id: Option<String>,
}
