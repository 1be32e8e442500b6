//! College routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};

use crate::auth::AdminUser;
use crate::db::{Class, ClassRepository, College, CollegeRepository, CreateCollege};
use crate::error::{AppError, Result};
use crate::state::AppState;
use super::extract::Json;

/// Create the colleges router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_colleges).post(create_college))
        .route("/:id/classes", get(list_college_classes))
}

/// GET /api/colleges
async fn list_colleges(State(state): State<AppState>) -> Result<Json<Vec<College>>> {
    let colleges = CollegeRepository::new(state.db()).list().await?;
    Ok(Json(colleges))
}

/// POST /api/colleges
async fn create_college(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(data): Json<CreateCollege>,
) -> Result<(StatusCode, Json<College>)> {
    if data.name.trim().is_empty() {
        return Err(AppError::BadRequest("College name is required".to_string()));
    }

    let college = CollegeRepository::new(state.db()).create(&data).await?;
    tracing::info!(admin_id = %admin.id, college_id = %college.id, "College created");
    Ok((StatusCode::CREATED, Json(college)))
}

/// GET /api/colleges/:id/classes
async fn list_college_classes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Class>>> {
    CollegeRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("College not found: {}", id)))?;

    let classes = ClassRepository::new(state.db()).list_for_college(&id).await?;
    Ok(Json(classes))
}
