//! College database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{is_unique_violation, new_id, now};
use crate::error::{AppError, Result};

/// College record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct College {
    pub id: String,
    pub name: String,
    pub domain: Option<String>,
    pub created_at: String,
}

/// Create college request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollege {
    pub name: String,
    pub domain: Option<String>,
}

/// College repository
pub struct CollegeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CollegeRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<College>> {
        let college = sqlx::query_as::<_, College>(
            "SELECT id, name, domain, created_at FROM colleges WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(college)
    }

    /// List colleges alphabetically
    pub async fn list(&self) -> Result<Vec<College>> {
        let colleges = sqlx::query_as::<_, College>(
            "SELECT id, name, domain, created_at FROM colleges ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(colleges)
    }

    pub async fn create(&self, data: &CreateCollege) -> Result<College> {
        let id = new_id();

        let result = sqlx::query(
            "INSERT INTO colleges (id, name, domain, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(data.name.trim())
        .bind(&data.domain)
        .bind(now())
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::BadRequest(format!(
                    "College already exists: {}",
                    data.name.trim()
                )));
            }
            Err(e) => return Err(e.into()),
        }

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created college".to_string()))
    }
}
