//! Comment database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{new_id, now};
use crate::error::{AppError, Result};

/// Comment record with author name
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub upload_id: String,
    pub user_id: String,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

/// Create comment request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub body: String,
}

/// Comment repository
pub struct CommentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CommentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.upload_id, c.user_id, u.username AS author, c.body, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(comment)
    }

    /// Comments on an upload, oldest first
    pub async fn list_for_upload(&self, upload_id: &str) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.upload_id, c.user_id, u.username AS author, c.body, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.upload_id = ?
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(upload_id)
        .fetch_all(self.pool)
        .await?;

        Ok(comments)
    }

    pub async fn create(&self, upload_id: &str, user_id: &str, body: &str) -> Result<Comment> {
        let id = new_id();

        sqlx::query(
            "INSERT INTO comments (id, upload_id, user_id, body, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(upload_id)
        .bind(user_id)
        .bind(body)
        .bind(now())
        .execute(self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created comment".to_string()))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
            .fetch_one(self.pool)
            .await?;

        Ok(result.0)
    }
}
