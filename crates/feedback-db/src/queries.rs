use crate::error::is_unique_violation;
use crate::models::{FeedbackRow, UserRow};
use crate::{Database, DbError, Result};
use rusqlite::{Connection, OptionalExtension, Row};

impl Database {
    // -- Users --

    /// Inserts a user. `password_hash` must already be hashed.
    /// Fails with [`DbError::DuplicateUsername`] when the username exists.
    pub fn create_user(&self, user: &UserRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, email, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &user.username,
                    &user.password,
                    &user.email,
                    &user.first_name,
                    &user.last_name,
                ),
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::DuplicateUsername
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    /// Deletes the user and, through the foreign key cascade, all of their
    /// feedback. Returns false if no such user existed.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM users WHERE username = ?1", [username])?;
            Ok(n > 0)
        })
    }

    // -- Feedback --

    /// Returns the id of the new row.
    pub fn insert_feedback(&self, title: &str, content: &str, username: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO feedback (title, content, username) VALUES (?1, ?2, ?3)",
                (title, content, username),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_feedback(&self, id: i64) -> Result<Option<FeedbackRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, content, username FROM feedback WHERE id = ?1",
                [id],
                feedback_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Oldest first.
    pub fn feedback_for_user(&self, username: &str) -> Result<Vec<FeedbackRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, username FROM feedback
                 WHERE username = ?1
                 ORDER BY id",
            )?;

            let rows = stmt
                .query_map([username], feedback_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn update_feedback(&self, id: i64, title: &str, content: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE feedback SET title = ?1, content = ?2 WHERE id = ?3",
                rusqlite::params![title, content, id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_feedback(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM feedback WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }
}

fn query_user(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT username, password, email, first_name, last_name FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                username: row.get(0)?,
                password: row.get(1)?,
                email: row.get(2)?,
                first_name: row.get(3)?,
                last_name: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<FeedbackRow> {
    Ok(FeedbackRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        username: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str) -> UserRow {
        UserRow {
            username: username.into(),
            password: "$argon2id$stub".into(),
            email: format!("{username}@example.com"),
            first_name: "First".into(),
            last_name: "Last".into(),
        }
    }

    #[test]
    fn duplicate_username_is_rejected_and_first_survives() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&user("alice")).unwrap();

        let mut second = user("alice");
        second.email = "other@example.com".into();
        let err = db.create_user(&second).unwrap_err();
        assert!(matches!(err, DbError::DuplicateUsername));

        let stored = db.get_user("alice").unwrap().unwrap();
        assert_eq!(stored.email, "alice@example.com");
    }

    #[test]
    fn missing_user_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_user("nobody").unwrap().is_none());
        assert!(!db.delete_user("nobody").unwrap());
    }

    #[test]
    fn deleting_user_cascades_to_their_feedback_only() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&user("alice")).unwrap();
        db.create_user(&user("bob")).unwrap();
        let a1 = db.insert_feedback("a1", "first", "alice").unwrap();
        let a2 = db.insert_feedback("a2", "second", "alice").unwrap();
        let b1 = db.insert_feedback("b1", "bob's", "bob").unwrap();

        assert!(db.delete_user("alice").unwrap());

        assert!(db.get_user("alice").unwrap().is_none());
        assert!(db.feedback_for_user("alice").unwrap().is_empty());
        assert!(db.get_feedback(a1).unwrap().is_none());
        assert!(db.get_feedback(a2).unwrap().is_none());
        assert_eq!(db.get_feedback(b1).unwrap().unwrap().title, "b1");
    }

    #[test]
    fn feedback_requires_existing_user() {
        let db = Database::open_in_memory().unwrap();
        let err = db.insert_feedback("t", "c", "ghost").unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
    }

    #[test]
    fn update_touches_only_the_target_item() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&user("alice")).unwrap();
        let first = db.insert_feedback("one", "uno", "alice").unwrap();
        let second = db.insert_feedback("two", "dos", "alice").unwrap();

        assert!(db.update_feedback(first, "ONE", "UNO").unwrap());

        let updated = db.get_feedback(first).unwrap().unwrap();
        assert_eq!((updated.title.as_str(), updated.content.as_str()), ("ONE", "UNO"));
        let untouched = db.get_feedback(second).unwrap().unwrap();
        assert_eq!((untouched.title.as_str(), untouched.content.as_str()), ("two", "dos"));
        assert!(!db.update_feedback(9999, "x", "y").unwrap());
    }

    #[test]
    fn list_is_ordered_and_delete_reports_presence() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&user("alice")).unwrap();
        let ids: Vec<i64> = ["a", "b", "c"]
            .iter()
            .map(|t| db.insert_feedback(t, "body", "alice").unwrap())
            .collect();

        let titles: Vec<String> = db
            .feedback_for_user("alice")
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, ["a", "b", "c"]);

        assert!(db.delete_feedback(ids[1]).unwrap());
        assert!(!db.delete_feedback(ids[1]).unwrap());
        assert_eq!(db.feedback_for_user("alice").unwrap().len(), 2);
    }
}
