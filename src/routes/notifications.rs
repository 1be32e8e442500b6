//! Notification routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::{Notification, NotificationRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;
use super::extract::{Json, Query};

/// Create the notifications router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", put(mark_all_read))
        .route("/:id/read", put(mark_read))
        .route("/:id", delete(delete_notification))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
}

#[derive(Serialize)]
struct UnreadCount {
    count: i64,
}

#[derive(Serialize)]
struct MarkedRead {
    updated: u64,
}

/// GET /api/notifications
async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let notifications = NotificationRepository::new(state.db())
        .list_for_user(&user.id, limit)
        .await?;
    Ok(Json(notifications))
}

/// GET /api/notifications/unread-count
async fn unread_count(State(state): State<AppState>, user: AuthUser) -> Result<Json<UnreadCount>> {
    let count = NotificationRepository::new(state.db())
        .unread_count(&user.id)
        .await?;
    Ok(Json(UnreadCount { count }))
}

/// PUT /api/notifications/:id/read
async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let updated = NotificationRepository::new(state.db())
        .mark_read(&id, &user.id)
        .await?;
    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Notification not found: {}", id)))
    }
}

/// PUT /api/notifications/read-all
async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> Result<Json<MarkedRead>> {
    let updated = NotificationRepository::new(state.db())
        .mark_all_read(&user.id)
        .await?;
    Ok(Json(MarkedRead { updated }))
}

/// DELETE /api/notifications/:id
async fn delete_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let deleted = NotificationRepository::new(state.db())
        .delete(&id, &user.id)
        .await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Notification not found: {}", id)))
    }
}
