//! Class and membership database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{contains_pattern, new_id, now};
use crate::error::{AppError, Result};

/// Class record with aggregate counts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Class {
    pub id: String,
    pub college_id: Option<String>,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub member_count: i64,
    pub upload_count: i64,
}

/// Create class request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClass {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub college_id: Option<String>,
}

/// Class listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassFilter {
    pub q: Option<String>,
    pub college_id: Option<String>,
}

const CLASS_SELECT: &str = r#"
    SELECT c.id, c.college_id, c.code, c.name, c.description, c.created_by, c.created_at,
           (SELECT COUNT(*) FROM class_members m WHERE m.class_id = c.id) AS member_count,
           (SELECT COUNT(*) FROM uploads u WHERE u.class_id = c.id) AS upload_count
    FROM classes c
"#;

/// Class repository
pub struct ClassRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ClassRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Class>> {
        let class = sqlx::query_as::<_, Class>(&format!("{} WHERE c.id = ?", CLASS_SELECT))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(class)
    }

    /// List classes matching an optional text query and college
    pub async fn list(&self, filter: &ClassFilter) -> Result<Vec<Class>> {
        let pattern = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(contains_pattern);

        let classes = sqlx::query_as::<_, Class>(&format!(
            r#"{}
            WHERE (? IS NULL OR c.code LIKE ? ESCAPE '\' OR c.name LIKE ? ESCAPE '\')
              AND (? IS NULL OR c.college_id = ?)
            ORDER BY c.code ASC, c.name ASC
            "#,
            CLASS_SELECT
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&filter.college_id)
        .bind(&filter.college_id)
        .fetch_all(self.pool)
        .await?;

        Ok(classes)
    }

    /// Classes the user has joined
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Class>> {
        let classes = sqlx::query_as::<_, Class>(&format!(
            r#"{}
            JOIN class_members cm ON cm.class_id = c.id
            WHERE cm.user_id = ?
            ORDER BY cm.joined_at DESC
            "#,
            CLASS_SELECT
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(classes)
    }

    /// Create a class; the creator joins it
    pub async fn create(&self, created_by: &str, data: &CreateClass) -> Result<Class> {
        let id = new_id();

        sqlx::query(
            r#"
            INSERT INTO classes (id, college_id, code, name, description, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&data.college_id)
        .bind(data.code.trim())
        .bind(data.name.trim())
        .bind(&data.description)
        .bind(created_by)
        .bind(now())
        .execute(self.pool)
        .await?;

        self.join(&id, created_by).await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created class".to_string()))
    }

    /// Join a class; joining twice is a no-op
    pub async fn join(&self, class_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO class_members (class_id, user_id, joined_at)
            VALUES (?, ?, ?)
            ON CONFLICT(class_id, user_id) DO NOTHING
            "#,
        )
        .bind(class_id)
        .bind(user_id)
        .bind(now())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn leave(&self, class_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM class_members WHERE class_id = ? AND user_id = ?")
            .bind(class_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_member(&self, class_id: &str, user_id: &str) -> Result<bool> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM class_members WHERE class_id = ? AND user_id = ?",
        )
        .bind(class_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(result.0 > 0)
    }

    /// Ids of every member of a class
    pub async fn member_ids(&self, class_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT user_id FROM class_members WHERE class_id = ?")
                .bind(class_id)
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Classes belonging to a college
    pub async fn list_for_college(&self, college_id: &str) -> Result<Vec<Class>> {
        self.list(&ClassFilter {
            q: None,
            college_id: Some(college_id.to_string()),
        })
        .await
    }

    pub async fn count(&self) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM classes")
            .fetch_one(self.pool)
            .await?;

        Ok(result.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, Role, UserRepository};

    #[tokio::test]
    async fn test_creator_joins_and_join_is_idempotent() {
        let pool = create_memory_pool().await.unwrap();
        let user = UserRepository::new(&pool)
            .create("c@uni.edu", "c", "hash", None, Role::User)
            .await
            .unwrap();
        let repo = ClassRepository::new(&pool);

        let class = repo
            .create(
                &user.id,
                &CreateClass {
                    code: "CS 101".into(),
                    name: "Intro to Programming".into(),
                    description: None,
                    college_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(class.member_count, 1);
        assert!(!repo.join(&class.id, &user.id).await.unwrap());
        assert!(repo.is_member(&class.id, &user.id).await.unwrap());

        let found = repo
            .list(&ClassFilter {
                q: Some("cs 1".into()),
                college_id: None,
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let pool = create_memory_pool().await.unwrap();
        let user = UserRepository::new(&pool)
            .create("w@uni.edu", "w", "hash", None, Role::User)
            .await
            .unwrap();
        let repo = ClassRepository::new(&pool);

        for code in ["CS_101", "CS 101", "MATH 100%"] {
            repo.create(
                &user.id,
                &CreateClass {
                    code: code.into(),
                    name: "Section".into(),
                    description: None,
                    college_id: None,
                },
            )
            .await
            .unwrap();
        }

        let search = |q: &str| ClassFilter {
            q: Some(q.into()),
            college_id: None,
        };

        let underscore = repo.list(&search("CS_1")).await.unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].code, "CS_101");

        let percent = repo.list(&search("%")).await.unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].code, "MATH 100%");
    }
}
