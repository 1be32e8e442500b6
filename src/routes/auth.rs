//! Registration and login routes

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, verify_password, AuthUser, MIN_PASSWORD_LEN};
use crate::db::{Role, User, UserRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;
use super::extract::{require_college, Json};

/// Create the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub college_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let email = request.email.trim();
    let username = request.username.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let repo = UserRepository::new(state.db());
    if repo.find_by_email(email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }
    require_college(&state, request.college_id.as_deref()).await?;

    let password_hash = hash_password(&request.password)?;
    let user = repo
        .create(email, username, &password_hash, request.college_id.as_deref(), Role::User)
        .await?;
    let token = state.tokens().issue(&user.id, Role::User)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let repo = UserRepository::new(state.db());
    let user = repo
        .find_by_email(&request.email)
        .await?
        .filter(|u| verify_password(&request.password, &u.password_hash))
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let role = Role::parse(&user.role).unwrap_or(Role::User);
    let token = state.tokens().issue(&user.id, role)?;

    tracing::debug!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}

/// GET /api/auth/me
async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<User>> {
    let user = UserRepository::new(state.db())
        .get(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}
