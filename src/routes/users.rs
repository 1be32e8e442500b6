//! User profile routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Router,
};
use serde::Deserialize;

use crate::auth::{hash_password, verify_password, AuthUser, MIN_PASSWORD_LEN};
use crate::db::{UpdateProfile, Upload, UploadFilter, UploadRepository, User, UserProfile, UserRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;
use super::extract::{require_college, Json, Query};

/// Create the users router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", put(update_me))
        .route("/me/password", put(change_password))
        .route("/:id", get(get_profile))
        .route("/:id/uploads", get(list_user_uploads))
}

#[derive(Debug, Deserialize)]
struct ChangePassword {
    current_password: String,
    new_password: String,
}

/// GET /api/users/:id
async fn get_profile(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>> {
    let profile = UserRepository::new(state.db())
        .profile(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", id)))?;
    Ok(Json(profile))
}

/// PUT /api/users/me
async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(data): Json<UpdateProfile>,
) -> Result<Json<User>> {
    if matches!(data.username.as_deref(), Some(name) if name.trim().is_empty()) {
        return Err(AppError::BadRequest("Username cannot be empty".to_string()));
    }
    require_college(&state, data.college_id.as_deref()).await?;

    let updated = UserRepository::new(state.db())
        .update_profile(&user.id, &data)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(updated))
}

/// PUT /api/users/me/password
async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(data): Json<ChangePassword>,
) -> Result<StatusCode> {
    if data.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let repo = UserRepository::new(state.db());
    let current = repo
        .get(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&data.current_password, &current.password_hash) {
        return Err(AppError::BadRequest("Current password is incorrect".to_string()));
    }

    repo.update_password(&user.id, &hash_password(&data.new_password)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/:id/uploads
async fn list_user_uploads(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Query(filter): Query<UploadFilter>,
) -> Result<Json<Vec<Upload>>> {
    let uploads = UploadRepository::new(state.db())
        .list_for_user(&id, &filter)
        .await?;
    Ok(Json(uploads))
}
