//! Class routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};

use crate::auth::AuthUser;
use crate::db::{Class, ClassFilter, ClassRepository, CreateClass, Upload, UploadFilter, UploadRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;
use super::extract::{require_college, Json, Query};

/// Create the classes router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_classes).post(create_class))
        .route("/mine", get(my_classes))
        .route("/:id", get(get_class))
        .route("/:id/join", post(join_class))
        .route("/:id/leave", delete(leave_class))
        .route("/:id/uploads", get(list_class_uploads))
}

/// Fetch a class or 404
pub(crate) async fn require_class(state: &AppState, id: &str) -> Result<Class> {
    ClassRepository::new(state.db())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Class not found: {}", id)))
}

/// GET /api/classes
async fn list_classes(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<ClassFilter>,
) -> Result<Json<Vec<Class>>> {
    let classes = ClassRepository::new(state.db()).list(&filter).await?;
    Ok(Json(classes))
}

/// POST /api/classes
async fn create_class(
    State(state): State<AppState>,
    user: AuthUser,
    Json(data): Json<CreateClass>,
) -> Result<(StatusCode, Json<Class>)> {
    if data.code.trim().is_empty() || data.name.trim().is_empty() {
        return Err(AppError::BadRequest("Class code and name are required".to_string()));
    }
    require_college(&state, data.college_id.as_deref()).await?;

    let class = ClassRepository::new(state.db()).create(&user.id, &data).await?;
    tracing::info!(class_id = %class.id, code = %class.code, "Class created");
    Ok((StatusCode::CREATED, Json(class)))
}

/// GET /api/classes/mine
async fn my_classes(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Class>>> {
    let classes = ClassRepository::new(state.db()).list_for_user(&user.id).await?;
    Ok(Json(classes))
}

/// GET /api/classes/:id
async fn get_class(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Class>> {
    Ok(Json(require_class(&state, &id).await?))
}

/// POST /api/classes/:id/join
async fn join_class(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Class>> {
    require_class(&state, &id).await?;
    ClassRepository::new(state.db()).join(&id, &user.id).await?;
    Ok(Json(require_class(&state, &id).await?))
}

/// DELETE /api/classes/:id/leave
async fn leave_class(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let left = ClassRepository::new(state.db()).leave(&id, &user.id).await?;
    if left {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Not a member of class: {}", id)))
    }
}

/// GET /api/classes/:id/uploads
async fn list_class_uploads(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Query(filter): Query<UploadFilter>,
) -> Result<Json<Vec<Upload>>> {
    require_class(&state, &id).await?;
    let uploads = UploadRepository::new(state.db())
        .list_for_class(&id, &filter)
        .await?;
    Ok(Json(uploads))
}
