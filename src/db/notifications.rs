//! Notification queries.

use chrono::Utc;
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{DbError, DbNotification, SocialDb};
use crate::types::NotificationKind;

fn map_notification(row: &Row) -> rusqlite::Result<DbNotification> {
    Ok(DbNotification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: NotificationKind::from_str_lossy(&row.get::<_, String>(2)?),
        title: row.get(3)?,
        body: row.get(4)?,
        is_read: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
    })
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, body, is_read, created_at";

impl SocialDb {
    pub fn insert_notification(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        body: Option<&str>,
    ) -> Result<DbNotification, DbError> {
        let notification = DbNotification {
            id: format!("ntf-{}", Uuid::new_v4()),
            user_id: user_id.to_string(),
            kind,
            title: title.to_string(),
            body: body.map(|s| s.to_string()),
            is_read: false,
            created_at: Utc::now().to_rfc3339(),
        };
        self.conn.execute(
            "INSERT INTO notifications (id, user_id, kind, title, body, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                notification.id,
                notification.user_id,
                notification.kind.as_str(),
                notification.title,
                notification.body,
                notification.created_at
            ],
        )?;
        Ok(notification)
    }

    /// Newest-first listing for the notification tray.
    pub fn notifications_for_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<DbNotification>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM notifications WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
            NOTIFICATION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id, limit as i64], map_notification)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn unread_notification_count(&self, user_id: &str) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Returns false when the notification doesn't exist.
    pub fn mark_notification_read(&self, notification_id: &str) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            [notification_id],
        )?;
        Ok(changed > 0)
    }

    /// Returns how many notifications flipped to read.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize, DbError> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            [user_id],
        )?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_utils::{seed_profile, test_db};
    use crate::types::NotificationKind;

    #[test]
    fn test_unread_count_and_mark_read() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");

        let first = db
            .insert_notification(
                "u1",
                NotificationKind::ConnectionRequest,
                "New connection request",
                Some("Dr. Ben Okafor wants to connect"),
            )
            .expect("insert");
        db.insert_notification("u1", NotificationKind::PostLike, "Your post was liked", None)
            .expect("insert");

        assert_eq!(db.unread_notification_count("u1").expect("count"), 2);

        assert!(db.mark_notification_read(&first.id).expect("mark"));
        assert_eq!(db.unread_notification_count("u1").expect("count"), 1);

        assert_eq!(db.mark_all_notifications_read("u1").expect("mark all"), 1);
        assert_eq!(db.unread_notification_count("u1").expect("count"), 0);

        // Unknown id is reported, not an error
        assert!(!db.mark_notification_read("ntf-missing").expect("mark"));
    }

    #[test]
    fn test_listing_is_scoped_to_user() {
        let db = test_db();
        seed_profile(&db, "u1", "Dr. Asha Rao");
        seed_profile(&db, "u2", "Dr. Ben Okafor");

        db.insert_notification("u1", NotificationKind::PostComment, "New comment", None)
            .expect("insert");
        db.insert_notification("u2", NotificationKind::PostComment, "New comment", None)
            .expect("insert");

        let mine = db.notifications_for_user("u1", 20).expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, "u1");
        assert!(!mine[0].is_read);
    }
}
