//! Notification database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{new_id, now};
use crate::error::Result;

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Comment,
    NewUpload,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Comment => "comment",
            NotificationKind::NewUpload => "new_upload",
            NotificationKind::System => "system",
        }
    }
}

/// Notification record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub upload_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

/// Notification repository
pub struct NotificationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NotificationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        kind: NotificationKind,
        message: &str,
        upload_id: Option<&str>,
    ) -> Result<String> {
        let id = new_id();

        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, message, upload_id, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(message)
        .bind(upload_id)
        .bind(now())
        .execute(self.pool)
        .await?;

        Ok(id)
    }

    /// Notifications for a user, newest first
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, kind, message, upload_id, is_read, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(result.0)
    }

    /// Mark one notification read; only the recipient can do so
    pub async fn mark_read(&self, id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
