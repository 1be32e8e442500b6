//! Comment routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Router,
};

use crate::auth::AuthUser;
use crate::db::{Comment, CommentRepository, CreateComment, NotificationKind, NotificationRepository};
use crate::error::{AppError, Result};
use crate::routes::uploads::require_upload;
use crate::state::AppState;
use super::extract::Json;

const MAX_COMMENT_LEN: usize = 2000;

/// Create the comments router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload/:upload_id", get(list_comments).post(create_comment))
        .route("/:id", delete(delete_comment))
}

/// GET /api/comments/upload/:upload_id
async fn list_comments(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(upload_id): Path<String>,
) -> Result<Json<Vec<Comment>>> {
    require_upload(&state, &upload_id).await?;
    let comments = CommentRepository::new(state.db())
        .list_for_upload(&upload_id)
        .await?;
    Ok(Json(comments))
}

/// POST /api/comments/upload/:upload_id
async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(upload_id): Path<String>,
    Json(data): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>)> {
    let body = data.body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
    }
    if body.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::BadRequest(format!(
            "Comment exceeds {} characters",
            MAX_COMMENT_LEN
        )));
    }

    let upload = require_upload(&state, &upload_id).await?;
    let comment = CommentRepository::new(state.db())
        .create(&upload.id, &user.id, body)
        .await?;

    if upload.user_id != user.id {
        let message = format!("{} commented on \"{}\"", user.username, upload.title);
        if let Err(e) = NotificationRepository::new(state.db())
            .create(&upload.user_id, NotificationKind::Comment, &message, Some(&upload.id))
            .await
        {
            tracing::warn!(upload_id = %upload.id, "Failed to notify uploader: {}", e);
        }
    }

    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/comments/:id
async fn delete_comment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let repo = CommentRepository::new(state.db());
    let comment = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment not found: {}", id)))?;

    if !user.can_modify(&comment.user_id) {
        return Err(AppError::Forbidden("Not authorized to delete this comment".to_string()));
    }

    repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
