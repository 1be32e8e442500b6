//! User database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{is_unique_violation, new_id, now};
use crate::error::{AppError, Result};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// User record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub college_id: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub role: String,
    pub college_id: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub upload_count: i64,
}

/// Profile update request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub college_id: Option<String>,
}

const USER_COLUMNS: &str = "id, email, username, password_hash, role, college_id, bio, avatar_url, created_at, updated_at";

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by id
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a new user
    ///
    /// A duplicate email is reported as a bad request and no row is written.
    pub async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
        college_id: Option<&str>,
        role: Role,
    ) -> Result<User> {
        let id = new_id();
        let now = now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, role, college_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(email.trim())
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(college_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::BadRequest("Email already registered".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created user".to_string()))
    }

    /// Public profile with upload count
    pub async fn profile(&self, id: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.username, u.role, u.college_id, u.bio, u.avatar_url, u.created_at,
                   (SELECT COUNT(*) FROM uploads WHERE user_id = u.id) AS upload_count
            FROM users u
            WHERE u.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(profile)
    }

    /// Update profile fields; absent fields keep their value
    pub async fn update_profile(&self, id: &str, data: &UpdateProfile) -> Result<Option<User>> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = COALESCE(?, username),
                bio = COALESCE(?, bio),
                avatar_url = COALESCE(?, avatar_url),
                college_id = COALESCE(?, college_id),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&data.username)
        .bind(&data.bio)
        .bind(&data.avatar_url)
        .bind(&data.college_id)
        .bind(now())
        .bind(id)
        .execute(self.pool)
        .await?;

        self.get(id).await
    }

    /// Replace the password hash
    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Change a user's role
    pub async fn set_role(&self, id: &str, role: Role) -> Result<Option<User>> {
        sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(now())
            .bind(id)
            .execute(self.pool)
            .await?;

        self.get(id).await
    }

    /// List all users, newest first
    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Delete a user and everything that cascades from it
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count users
    pub async fn count(&self) -> Result<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;

        Ok(result.0)
    }
}
