//! Upload metadata database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{contains_pattern, new_id, now};
use crate::error::{AppError, Result};

/// Upload record as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: String,
    pub class_id: String,
    pub user_id: String,
    pub uploader: String,
    pub title: String,
    pub summary: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub file_hash: String,
    #[serde(skip_serializing, default)]
    pub storage_key: String,
    pub download_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Raw row; tags are stored as a JSON array
#[derive(sqlx::FromRow)]
struct UploadRow {
    id: String,
    class_id: String,
    user_id: String,
    uploader: String,
    title: String,
    summary: Option<String>,
    category: String,
    tags: String,
    file_name: String,
    mime_type: String,
    file_size: i64,
    file_hash: String,
    storage_key: String,
    download_count: i64,
    created_at: String,
    updated_at: String,
}

impl From<UploadRow> for Upload {
    fn from(row: UploadRow) -> Self {
        let tags = serde_json::from_str(&row.tags).unwrap_or_else(|e| {
            tracing::warn!(upload_id = %row.id, "Unreadable tags column: {}", e);
            Vec::new()
        });

        Upload {
            id: row.id,
            class_id: row.class_id,
            user_id: row.user_id,
            uploader: row.uploader,
            title: row.title,
            summary: row.summary,
            category: row.category,
            tags,
            file_name: row.file_name,
            mime_type: row.mime_type,
            file_size: row.file_size,
            file_hash: row.file_hash,
            storage_key: row.storage_key,
            download_count: row.download_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Data for a new upload row
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub class_id: String,
    pub user_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub file_hash: String,
    pub storage_key: String,
}

/// Metadata update request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUpload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Upload listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
}

const UPLOAD_SELECT: &str = r#"
    SELECT up.id, up.class_id, up.user_id, us.username AS uploader, up.title, up.summary,
           up.category, up.tags, up.file_name, up.mime_type, up.file_size, up.file_hash,
           up.storage_key, up.download_count, up.created_at, up.updated_at
    FROM uploads up
    JOIN users us ON us.id = up.user_id
"#;

const FILTER_CLAUSE: &str = r#"
      AND (? IS NULL OR up.title LIKE ? ESCAPE '\' OR up.summary LIKE ? ESCAPE '\'
           OR up.tags LIKE ? ESCAPE '\')
      AND (? IS NULL OR up.category = ? COLLATE NOCASE)
      AND (? IS NULL OR EXISTS (
            SELECT 1 FROM json_each(up.tags) t WHERE t.value = ? COLLATE NOCASE))
    ORDER BY up.created_at DESC
    LIMIT ?
"#;

pub const MAX_LIST_LIMIT: i64 = 200;

/// Upload repository
pub struct UploadRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UploadRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Upload>> {
        let row = sqlx::query_as::<_, UploadRow>(&format!("{} WHERE up.id = ?", UPLOAD_SELECT))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Upload::from))
    }

    pub async fn create(&self, data: &NewUpload) -> Result<Upload> {
        let id = new_id();
        let now = now();
        let tags = serde_json::to_string(&data.tags)?;

        sqlx::query(
            r#"
            INSERT INTO uploads (id, class_id, user_id, title, summary, category, tags, file_name,
                                 mime_type, file_size, file_hash, storage_key, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&data.class_id)
        .bind(&data.user_id)
        .bind(&data.title)
        .bind(&data.summary)
        .bind(&data.category)
        .bind(&tags)
        .bind(&data.file_name)
        .bind(&data.mime_type)
        .bind(data.file_size)
        .bind(&data.file_hash)
        .bind(&data.storage_key)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created upload".to_string()))
    }

    /// Uploads in a class, newest first
    pub async fn list_for_class(&self, class_id: &str, filter: &UploadFilter) -> Result<Vec<Upload>> {
        self.filtered(Some(("up.class_id", class_id)), filter).await
    }

    /// Uploads by a user, newest first
    pub async fn list_for_user(&self, user_id: &str, filter: &UploadFilter) -> Result<Vec<Upload>> {
        self.filtered(Some(("up.user_id", user_id)), filter).await
    }

    /// Search across all uploads
    pub async fn search(&self, filter: &UploadFilter) -> Result<Vec<Upload>> {
        self.filtered(None, filter).await
    }

    async fn filtered(
        &self,
        scope: Option<(&'static str, &str)>,
        filter: &UploadFilter,
    ) -> Result<Vec<Upload>> {
        let pattern = non_empty(&filter.q).map(contains_pattern);
        let category = non_empty(&filter.category);
        let tag = non_empty(&filter.tag);
        let limit = filter.limit.unwrap_or(MAX_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

        let sql = match scope {
            Some((column, _)) => format!("{} WHERE {} = ? {}", UPLOAD_SELECT, column, FILTER_CLAUSE),
            None => format!("{} WHERE 1 = 1 {}", UPLOAD_SELECT, FILTER_CLAUSE),
        };

        let mut query = sqlx::query_as::<_, UploadRow>(&sql);
        if let Some((_, value)) = scope {
            query = query.bind(value);
        }

        let rows = query
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(category)
            .bind(category)
            .bind(tag)
            .bind(tag)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Upload::from).collect())
    }

    /// Update metadata; absent fields keep their value
    pub async fn update(&self, id: &str, data: &UpdateUpload) -> Result<Option<Upload>> {
        let tags = data.tags.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            r#"
            UPDATE uploads
            SET title = COALESCE(?, title),
                summary = COALESCE(?, summary),
                category = COALESCE(?, category),
                tags = COALESCE(?, tags),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&data.title)
        .bind(&data.summary)
        .bind(&data.category)
        .bind(&tags)
        .bind(now())
        .bind(id)
        .execute(self.pool)
        .await?;

        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM uploads WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_downloads(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE uploads SET download_count = download_count + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Storage keys of every upload owned by a user
    pub async fn storage_keys_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT storage_key FROM uploads WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM uploads")
            .fetch_one(self.pool)
            .await?;

        Ok(result.0)
    }

    /// Sum of stored file sizes
    pub async fn total_bytes(&self) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COALESCE(SUM(file_size), 0) FROM uploads")
            .fetch_one(self.pool)
            .await?;

        Ok(result.0)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
