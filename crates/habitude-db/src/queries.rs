use crate::models::{DueHabitRow, HabitPatch, HabitRow, HabitWrite, UserPatch, UserRow};
use crate::{Database, DbError, DbResult};
use habitude_core::{HabitCandidate, validate};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        telegram_chat_id: Option<&str>,
        city: Option<&str>,
        phone: Option<&str>,
    ) -> DbResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, telegram_chat_id, city, phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, email, password_hash, telegram_chat_id, city, phone],
            )
            .map_err(map_unique_email)?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> DbResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn update_user(&self, id: &str, patch: &UserPatch) -> DbResult<UserRow> {
        self.with_conn_mut(|conn| {
            let existing = query_user(conn, "id", id)?.ok_or(DbError::NotFound)?;

            let email = patch.email.as_deref().unwrap_or(&existing.email);
            let password = patch.password.as_deref().unwrap_or(&existing.password);
            let chat_id = patch
                .telegram_chat_id
                .as_deref()
                .or(existing.telegram_chat_id.as_deref());
            let city = patch.city.as_deref().or(existing.city.as_deref());
            let phone = patch.phone.as_deref().or(existing.phone.as_deref());

            conn.execute(
                "UPDATE users
                 SET email = ?2, password = ?3, telegram_chat_id = ?4, city = ?5, phone = ?6
                 WHERE id = ?1",
                params![id, email, password, chat_id, city, phone],
            )
            .map_err(map_unique_email)?;

            query_user(conn, "id", id)?.ok_or(DbError::NotFound)
        })
    }

    pub fn touch_last_login(&self, id: &str) -> DbResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    /// Deactivate users whose last login predates `cutoff`
    /// (`YYYY-MM-DD HH:MM:SS`). Users who never logged in are left alone.
    pub fn deactivate_inactive_users(&self, cutoff: &str) -> DbResult<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE users SET is_active = 0
                 WHERE is_active = 1
                   AND last_login IS NOT NULL
                   AND last_login < ?1",
                [cutoff],
            )?;
            Ok(n)
        })
    }

    // -- Habits --

    /// Insert a habit after running the full rule set. The linked habit
    /// is resolved inside the same connection lock so its pleasant flag
    /// cannot go stale between the check and the write.
    pub fn create_habit(&self, id: &str, user_id: &str, habit: &HabitWrite) -> DbResult<HabitRow> {
        self.with_conn_mut(|conn| {
            check_rules(conn, user_id, habit)?;

            conn.execute(
                "INSERT INTO habits (id, user_id, place, time, action, is_pleasant,
                                     linked_habit_id, periodicity, reward, execution_time, is_public)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id,
                    user_id,
                    habit.place,
                    habit.time,
                    habit.action,
                    habit.is_pleasant,
                    habit.linked_habit_id,
                    habit.periodicity,
                    habit.reward,
                    habit.execution_time,
                    habit.is_public,
                ],
            )?;

            query_habit(conn, id)?.ok_or(DbError::NotFound)
        })
    }

    /// Merge a patch over the stored record, re-validate the whole thing,
    /// and write it back. Ownership is the caller's concern; the rule
    /// gate is not.
    pub fn update_habit(&self, id: &str, patch: &HabitPatch) -> DbResult<HabitRow> {
        self.with_conn_mut(|conn| {
            let existing = query_habit(conn, id)?.ok_or(DbError::NotFound)?;

            let merged = HabitWrite {
                place: patch.place.clone().unwrap_or(existing.place),
                time: patch.time.clone().unwrap_or(existing.time),
                action: patch.action.clone().unwrap_or(existing.action),
                is_pleasant: patch.is_pleasant.unwrap_or(existing.is_pleasant),
                linked_habit_id: patch
                    .linked_habit_id
                    .clone()
                    .unwrap_or(existing.linked_habit_id),
                periodicity: patch.periodicity.unwrap_or(existing.periodicity),
                reward: patch.reward.clone().unwrap_or(existing.reward),
                execution_time: patch.execution_time.unwrap_or(existing.execution_time),
                is_public: patch.is_public.unwrap_or(existing.is_public),
            };

            check_rules(conn, &existing.user_id, &merged)?;

            conn.execute(
                "UPDATE habits
                 SET place = ?2, time = ?3, action = ?4, is_pleasant = ?5,
                     linked_habit_id = ?6, periodicity = ?7, reward = ?8,
                     execution_time = ?9, is_public = ?10
                 WHERE id = ?1",
                params![
                    id,
                    merged.place,
                    merged.time,
                    merged.action,
                    merged.is_pleasant,
                    merged.linked_habit_id,
                    merged.periodicity,
                    merged.reward,
                    merged.execution_time,
                    merged.is_public,
                ],
            )?;

            query_habit(conn, id)?.ok_or(DbError::NotFound)
        })
    }

    pub fn get_habit(&self, id: &str) -> DbResult<Option<HabitRow>> {
        self.with_conn(|conn| query_habit(conn, id))
    }

    pub fn delete_habit(&self, id: &str) -> DbResult<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM habits WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn habits_for_user(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<(u64, Vec<HabitRow>)> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM habits WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT id, user_id, place, time, action, is_pleasant, linked_habit_id,
                        periodicity, reward, execution_time, is_public, last_notified, created_at
                 FROM habits WHERE user_id = ?1
                 ORDER BY created_at, id
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit, offset], map_habit)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok((count, rows))
        })
    }

    pub fn public_habits(&self, limit: u32, offset: u32) -> DbResult<(u64, Vec<HabitRow>)> {
        self.with_conn(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM habits WHERE is_public = 1",
                [],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT id, user_id, place, time, action, is_pleasant, linked_habit_id,
                        periodicity, reward, execution_time, is_public, last_notified, created_at
                 FROM habits WHERE is_public = 1
                 ORDER BY created_at, id
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![limit, offset], map_habit)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok((count, rows))
        })
    }

    /// Public habits due for a reminder: trigger time has passed today
    /// and the persisted watermark allows another fire (never notified,
    /// or the periodicity window has elapsed since the last one).
    pub fn due_habits(&self, time_of_day: &str, today: &str) -> DbResult<Vec<DueHabitRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT h.id, h.action, h.time, h.place, u.telegram_chat_id
                 FROM habits h
                 JOIN users u ON u.id = h.user_id
                 WHERE h.is_public = 1
                   AND h.time <= ?1
                   AND (h.last_notified IS NULL
                        OR date(h.last_notified, '+' || h.periodicity || ' days') <= ?2)
                 ORDER BY h.time, h.id",
            )?;
            let rows = stmt
                .query_map(params![time_of_day, today], |row| {
                    Ok(DueHabitRow {
                        id: row.get(0)?,
                        action: row.get(1)?,
                        time: row.get(2)?,
                        place: row.get(3)?,
                        telegram_chat_id: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn mark_notified(&self, id: &str, date: &str) -> DbResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE habits SET last_notified = ?2 WHERE id = ?1",
                params![id, date],
            )?;
            Ok(())
        })
    }
}

/// Handlers check for a taken email up front, but the UNIQUE index is
/// what actually decides under concurrency; surface its violation as a
/// duplicate rather than a generic SQLite error.
fn map_unique_email(e: rusqlite::Error) -> DbError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DbError::DuplicateEmail
        }
        _ => DbError::Sqlite(e),
    }
}

/// The mandatory pre-write gate: every habit insert and update funnels
/// through here, so no caller can skip validation.
fn check_rules(conn: &Connection, owner_id: &str, habit: &HabitWrite) -> DbResult<()> {
    let linked_is_pleasant = match habit.linked_habit_id.as_deref() {
        Some(link_id) => {
            // A link may only target a habit owned by the same user;
            // anything else reads as not-found.
            let pleasant: Option<bool> = conn
                .query_row(
                    "SELECT is_pleasant FROM habits WHERE id = ?1 AND user_id = ?2",
                    params![link_id, owner_id],
                    |row| row.get(0),
                )
                .optional()?;
            Some(pleasant.ok_or(DbError::LinkedHabitNotFound)?)
        }
        None => None,
    };

    let linked_habit = habit
        .linked_habit_id
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| DbError::LinkedHabitNotFound)?;

    let candidate = HabitCandidate {
        is_pleasant: habit.is_pleasant,
        linked_habit,
        periodicity: habit.periodicity,
        reward: habit.reward.clone(),
        execution_time: habit.execution_time,
    };

    validate(&candidate, linked_is_pleasant).map_err(DbError::Invalid)
}

fn query_user(conn: &Connection, column: &str, value: &str) -> DbResult<Option<UserRow>> {
    let sql = format!(
        "SELECT id, email, password, telegram_chat_id, city, phone, is_active, last_login, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                telegram_chat_id: row.get(3)?,
                city: row.get(4)?,
                phone: row.get(5)?,
                is_active: row.get(6)?,
                last_login: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_habit(conn: &Connection, id: &str) -> DbResult<Option<HabitRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, place, time, action, is_pleasant, linked_habit_id,
                periodicity, reward, execution_time, is_public, last_notified, created_at
         FROM habits WHERE id = ?1",
    )?;

    let row = stmt.query_row([id], map_habit).optional()?;
    Ok(row)
}

fn map_habit(row: &rusqlite::Row<'_>) -> rusqlite::Result<HabitRow> {
    Ok(HabitRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        place: row.get(2)?,
        time: row.get(3)?,
        action: row.get(4)?,
        is_pleasant: row.get(5)?,
        linked_habit_id: row.get(6)?,
        periodicity: row.get(7)?,
        reward: row.get(8)?,
        execution_time: row.get(9)?,
        is_public: row.get(10)?,
        last_notified: row.get(11)?,
        created_at: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitude_core::Violation;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn user(db: &Database, email: &str, chat_id: Option<&str>) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, email, "hash", chat_id, None, None)
            .unwrap();
        id
    }

    fn plain_habit() -> HabitWrite {
        HabitWrite {
            place: "Park".into(),
            time: "12:00:00".into(),
            action: "Running".into(),
            is_pleasant: false,
            linked_habit_id: None,
            periodicity: 7,
            reward: None,
            execution_time: 60,
            is_public: false,
        }
    }

    #[test]
    fn create_and_fetch_roundtrip() {
        let db = db();
        let owner = user(&db, "a@example.com", None);
        let id = Uuid::new_v4().to_string();

        let row = db.create_habit(&id, &owner, &plain_habit()).unwrap();
        assert_eq!(row.action, "Running");
        assert_eq!(row.user_id, owner);

        let fetched = db.get_habit(&id).unwrap().unwrap();
        assert_eq!(fetched.execution_time, 60);
    }

    #[test]
    fn invalid_habit_reports_every_violation() {
        let db = db();
        let owner = user(&db, "a@example.com", None);

        let mut habit = plain_habit();
        habit.periodicity = 6;
        habit.execution_time = 130;

        let err = db
            .create_habit(&Uuid::new_v4().to_string(), &owner, &habit)
            .unwrap_err();
        match err {
            DbError::Invalid(violations) => {
                assert!(violations.contains(&Violation::PeriodicityTooFrequent));
                assert!(violations.contains(&Violation::ExecutionTimeTooLong));
                assert_eq!(violations.len(), 2);
            }
            other => panic!("expected Invalid, got {other:?}"),
        }

        // nothing was written
        let (count, _) = db.habits_for_user(&owner, 5, 0).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn update_is_validated_over_the_merged_record() {
        let db = db();
        let owner = user(&db, "a@example.com", None);
        let id = Uuid::new_v4().to_string();
        db.create_habit(&id, &owner, &plain_habit()).unwrap();

        let patch = HabitPatch {
            execution_time: Some(121),
            ..Default::default()
        };
        assert!(matches!(
            db.update_habit(&id, &patch).unwrap_err(),
            DbError::Invalid(_)
        ));

        let patch = HabitPatch {
            execution_time: Some(30),
            ..Default::default()
        };
        let row = db.update_habit(&id, &patch).unwrap();
        assert_eq!(row.execution_time, 30);
        assert_eq!(row.action, "Running");
    }

    #[test]
    fn link_must_target_a_habit_of_the_same_user() {
        let db = db();
        let alice = user(&db, "alice@example.com", None);
        let bob = user(&db, "bob@example.com", None);

        let mut pleasant = plain_habit();
        pleasant.is_pleasant = true;
        let pleasant_id = Uuid::new_v4().to_string();
        db.create_habit(&pleasant_id, &bob, &pleasant).unwrap();

        let mut linked = plain_habit();
        linked.linked_habit_id = Some(pleasant_id.clone());
        let err = db
            .create_habit(&Uuid::new_v4().to_string(), &alice, &linked)
            .unwrap_err();
        assert!(matches!(err, DbError::LinkedHabitNotFound));

        // same link is fine for the habit's actual owner
        db.create_habit(&Uuid::new_v4().to_string(), &bob, &linked)
            .unwrap();
    }

    #[test]
    fn linking_a_non_pleasant_habit_is_rejected() {
        let db = db();
        let owner = user(&db, "a@example.com", None);
        let target_id = Uuid::new_v4().to_string();
        db.create_habit(&target_id, &owner, &plain_habit()).unwrap();

        let mut linked = plain_habit();
        linked.linked_habit_id = Some(target_id);
        let err = db
            .create_habit(&Uuid::new_v4().to_string(), &owner, &linked)
            .unwrap_err();
        match err {
            DbError::Invalid(v) => assert_eq!(v, vec![Violation::LinkNotPleasant]),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn deleting_a_linked_habit_clears_the_reference() {
        let db = db();
        let owner = user(&db, "a@example.com", None);

        let mut pleasant = plain_habit();
        pleasant.is_pleasant = true;
        let pleasant_id = Uuid::new_v4().to_string();
        db.create_habit(&pleasant_id, &owner, &pleasant).unwrap();

        let mut linked = plain_habit();
        linked.linked_habit_id = Some(pleasant_id.clone());
        let linked_id = Uuid::new_v4().to_string();
        db.create_habit(&linked_id, &owner, &linked).unwrap();

        assert!(db.delete_habit(&pleasant_id).unwrap());

        // referencing habit survives, reference is gone
        let row = db.get_habit(&linked_id).unwrap().unwrap();
        assert_eq!(row.linked_habit_id, None);
    }

    #[test]
    fn due_scan_respects_public_flag_time_and_watermark() {
        let db = db();
        let owner = user(&db, "a@example.com", Some("chat-1"));

        let mut public_due = plain_habit();
        public_due.is_public = true;
        public_due.time = "08:00:00".into();
        let due_id = Uuid::new_v4().to_string();
        db.create_habit(&due_id, &owner, &public_due).unwrap();

        let mut public_later = plain_habit();
        public_later.is_public = true;
        public_later.time = "22:00:00".into();
        db.create_habit(&Uuid::new_v4().to_string(), &owner, &public_later)
            .unwrap();

        let private_due = plain_habit(); // 12:00, not public
        db.create_habit(&Uuid::new_v4().to_string(), &owner, &private_due)
            .unwrap();

        let due = db.due_habits("13:00:00", "2026-08-23").unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, due_id);
        assert_eq!(due[0].telegram_chat_id.as_deref(), Some("chat-1"));

        // watermark suppresses the habit until periodicity days elapse
        db.mark_notified(&due_id, "2026-08-23").unwrap();
        assert!(db.due_habits("13:00:00", "2026-08-23").unwrap().is_empty());
        assert!(db.due_habits("13:00:00", "2026-08-29").unwrap().is_empty());
        assert_eq!(db.due_habits("13:00:00", "2026-08-30").unwrap().len(), 1);
    }

    #[test]
    fn duplicate_email_is_reported_as_such() {
        let db = db();
        user(&db, "a@example.com", None);

        // insert races past any handler-level existence check straight
        // into the UNIQUE index
        let err = db
            .create_user(&Uuid::new_v4().to_string(), "a@example.com", "hash", None, None, None)
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateEmail));

        let other = user(&db, "b@example.com", None);
        let patch = UserPatch {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_user(&other, &patch).unwrap_err(),
            DbError::DuplicateEmail
        ));
    }

    #[test]
    fn inactive_users_are_deactivated() {
        let db = db();
        let stale = user(&db, "stale@example.com", None);
        let fresh = user(&db, "fresh@example.com", None);
        let never = user(&db, "never@example.com", None);

        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = '2000-01-01 00:00:00' WHERE id = ?1",
                [&stale],
            )?;
            Ok(())
        })
        .unwrap();
        db.touch_last_login(&fresh).unwrap();

        let n = db
            .deactivate_inactive_users("2000-02-01 00:00:00")
            .unwrap();
        assert_eq!(n, 1);

        assert!(!db.get_user_by_id(&stale).unwrap().unwrap().is_active);
        assert!(db.get_user_by_id(&fresh).unwrap().unwrap().is_active);
        assert!(db.get_user_by_id(&never).unwrap().unwrap().is_active);
    }

    #[test]
    fn deleting_a_user_cascades_their_habits() {
        let db = db();
        let owner = user(&db, "a@example.com", None);
        let id = Uuid::new_v4().to_string();
        db.create_habit(&id, &owner, &plain_habit()).unwrap();

        db.with_conn_mut(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [&owner])?;
            Ok(())
        })
        .unwrap();

        assert!(db.get_habit(&id).unwrap().is_none());
    }
}
