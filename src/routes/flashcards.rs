//! Flashcard set routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};

use crate::auth::AuthUser;
use crate::db::{CreateFlashcardSet, FlashcardRepository, FlashcardSet, FlashcardSetWithCards};
use crate::error::{AppError, Result};
use crate::routes::uploads::require_upload;
use crate::state::AppState;
use super::extract::Json;

/// Create the flashcards router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sets).post(create_set))
        .route("/:id", get(get_set).delete(delete_set))
}

/// GET /api/flashcards
async fn list_sets(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<FlashcardSet>>> {
    let sets = FlashcardRepository::new(state.db())
        .list_for_user(&user.id)
        .await?;
    Ok(Json(sets))
}

/// POST /api/flashcards
async fn create_set(
    State(state): State<AppState>,
    user: AuthUser,
    Json(data): Json<CreateFlashcardSet>,
) -> Result<(StatusCode, Json<FlashcardSetWithCards>)> {
    if data.title.trim().is_empty() {
        return Err(AppError::BadRequest("Set title is required".to_string()));
    }
    if data
        .cards
        .iter()
        .any(|c| c.front.trim().is_empty() || c.back.trim().is_empty())
    {
        return Err(AppError::BadRequest("Cards need both a front and a back".to_string()));
    }
    if let Some(upload_id) = &data.upload_id {
        require_upload(&state, upload_id).await?;
    }

    let set = FlashcardRepository::new(state.db())
        .create(&user.id, &data)
        .await?;
    Ok((StatusCode::CREATED, Json(set)))
}

/// GET /api/flashcards/:id
async fn get_set(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FlashcardSetWithCards>> {
    let set = FlashcardRepository::new(state.db())
        .get_with_cards(&id)
        .await?
        .filter(|s| s.set.user_id == user.id)
        .ok_or_else(|| AppError::NotFound(format!("Flashcard set not found: {}", id)))?;
    Ok(Json(set))
}

/// DELETE /api/flashcards/:id
async fn delete_set(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let repo = FlashcardRepository::new(state.db());
    let set = repo
        .get_set(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Flashcard set not found: {}", id)))?;

    if set.user_id != user.id {
        return Err(AppError::Forbidden("Not authorized to delete this set".to_string()));
    }

    repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
