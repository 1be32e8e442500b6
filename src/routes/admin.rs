//! Admin routes
//!
//! Every handler takes [`AdminUser`], so non-admins get 403 before any work.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::AdminUser;
use crate::db::{
    ClassRepository, CommentRepository, DownloadRepository, Role, UploadRepository, User,
    UserRepository,
};
use crate::error::{AppError, Result};
use crate::routes::uploads::{remove_upload, require_upload};
use crate::state::AppState;
use super::extract::Json;

/// Create the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/users/:id/role", put(set_role))
        .route("/users/:id", delete(delete_user))
        .route("/uploads/:id", delete(delete_upload))
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users: i64,
    pub classes: i64,
    pub uploads: i64,
    pub comments: i64,
    pub downloads: i64,
    pub storage_bytes: i64,
}

#[derive(Debug, Deserialize)]
struct SetRole {
    role: String,
}

/// GET /api/admin/stats
async fn stats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<AdminStats>> {
    let db = state.db();
    let uploads = UploadRepository::new(db);

    Ok(Json(AdminStats {
        users: UserRepository::new(db).count().await?,
        classes: ClassRepository::new(db).count().await?,
        uploads: uploads.count().await?,
        comments: CommentRepository::new(db).count().await?,
        downloads: DownloadRepository::new(db).count().await?,
        storage_bytes: uploads.total_bytes().await?,
    }))
}

/// GET /api/admin/users
async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<User>>> {
    let users = UserRepository::new(state.db()).list().await?;
    Ok(Json(users))
}

/// PUT /api/admin/users/:id/role
async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(data): Json<SetRole>,
) -> Result<Json<User>> {
    let role = Role::parse(&data.role)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown role: {}", data.role)))?;

    if id == admin.id && role != Role::Admin {
        return Err(AppError::BadRequest("Admins cannot demote themselves".to_string()));
    }

    let user = UserRepository::new(state.db())
        .set_role(&id, role)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", id)))?;

    tracing::info!(admin_id = %admin.id, user_id = %id, role = role.as_str(), "Role changed");
    Ok(Json(user))
}

/// DELETE /api/admin/users/:id
async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if id == admin.id {
        return Err(AppError::BadRequest("Admins cannot delete themselves".to_string()));
    }

    let users = UserRepository::new(state.db());
    users
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", id)))?;

    // Rows cascade with the user; stored files have to go explicitly
    let keys = UploadRepository::new(state.db())
        .storage_keys_for_user(&id)
        .await?;
    for key in &keys {
        if let Err(e) = state.store().delete_object(key).await {
            tracing::warn!(key = %key, "Stored file not removed: {}", e);
        }
    }

    users.delete(&id).await?;
    tracing::info!(admin_id = %admin.id, user_id = %id, files = keys.len(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/admin/uploads/:id
async fn delete_upload(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let upload = require_upload(&state, &id).await?;
    remove_upload(&state, &upload).await?;
    tracing::info!(admin_id = %admin.id, upload_id = %id, "Upload removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
