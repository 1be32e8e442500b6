//! Download history database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{new_id, now};
use crate::error::Result;

/// Download history entry joined with upload metadata
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DownloadEntry {
    pub id: String,
    pub upload_id: String,
    pub title: String,
    pub file_name: String,
    pub class_id: String,
    pub downloaded_at: String,
}

/// Download history repository
pub struct DownloadRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DownloadRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, user_id: &str, upload_id: &str) -> Result<String> {
        let id = new_id();

        sqlx::query(
            "INSERT INTO download_history (id, user_id, upload_id, downloaded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(upload_id)
        .bind(now())
        .execute(self.pool)
        .await?;

        Ok(id)
    }

    /// A user's history, newest first
    pub async fn list_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<DownloadEntry>> {
        let entries = sqlx::query_as::<_, DownloadEntry>(
            r#"
            SELECT d.id, d.upload_id, u.title, u.file_name, u.class_id, d.downloaded_at
            FROM download_history d
            JOIN uploads u ON u.id = d.upload_id
            WHERE d.user_id = ?
            ORDER BY d.downloaded_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn clear_for_user(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM download_history WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM download_history")
            .fetch_one(self.pool)
            .await?;

        Ok(result.0)
    }
}
