use rusqlite::Connection;
use uuid::Uuid;

use crate::Database;
use crate::StoreError;
use crate::models::NotificationRow;

/// Append an unread notification. Always called inside the enclosing
/// operation's transaction, so a reward event and its alert land together.
pub(crate) fn notify(
    conn: &Connection,
    user_id: &str,
    message: &str,
    kind: &str,
    now: &str,
) -> Result<String, StoreError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO notifications (id, user_id, message, kind, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        rusqlite::params![id, user_id, message, kind, now],
    )?;
    Ok(id)
}

impl Database {
    pub fn unread_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<NotificationRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message, kind, is_read, created_at
                 FROM notifications
                 WHERE user_id = ?1 AND is_read = 0
                 ORDER BY created_at DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message: row.get(2)?,
                        kind: row.get(3)?,
                        is_read: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Idempotent: marking an already-read notification is a no-op.
    pub fn mark_notification_read(&self, id: &str) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1",
                [id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("notification"));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn mark_read_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4().to_string();
        db.create_user(&user, "notify@example.com", "Notify").unwrap();

        let note_id = db
            .with_conn_mut(|conn| {
                notify(conn, &user, "hello", "test", &Utc::now().to_rfc3339())
            })
            .unwrap();

        assert_eq!(db.unread_notifications(&user).unwrap().len(), 1);

        db.mark_notification_read(&note_id).unwrap();
        db.mark_notification_read(&note_id).unwrap();

        assert!(db.unread_notifications(&user).unwrap().is_empty());
    }

    #[test]
    fn mark_read_on_missing_notification_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .mark_notification_read(&Uuid::new_v4().to_string())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("notification")));
    }

    #[test]
    fn unread_only_returns_unread_rows_for_the_user() {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4().to_string();
        let bob = Uuid::new_v4().to_string();
        db.create_user(&alice, "a@example.com", "Alice").unwrap();
        db.create_user(&bob, "b@example.com", "Bob").unwrap();

        let read_id = db
            .with_conn_mut(|conn| {
                let now = Utc::now().to_rfc3339();
                notify(conn, &alice, "first", "test", &now)?;
                notify(conn, &bob, "other user", "test", &now)?;
                notify(conn, &alice, "second", "test", &now)
            })
            .unwrap();
        db.mark_notification_read(&read_id).unwrap();

        let unread = db.unread_notifications(&alice).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].message, "first");
    }
}
