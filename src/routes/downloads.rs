//! Download routes
//!
//! Endpoints:
//! - POST /api/downloads/:upload_id - Record a download and return a signed URL
//! - GET /api/downloads - Own download history, newest first
//! - DELETE /api/downloads - Clear own history

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::{DownloadEntry, DownloadRepository, UploadRepository};
use crate::error::Result;
use crate::routes::uploads::require_upload;
use crate::state::AppState;
use crate::storage::SignedUrl;
use super::extract::{Json, Query};

/// Create the downloads router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(history).delete(clear_history))
        .route("/:upload_id", post(record_download))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

#[derive(Serialize)]
struct DownloadResponse {
    upload_id: String,
    file_name: String,
    #[serde(flatten)]
    signed: SignedUrl,
}

#[derive(Serialize)]
struct Cleared {
    deleted: u64,
}

/// POST /api/downloads/:upload_id
async fn record_download(
    State(state): State<AppState>,
    user: AuthUser,
    Path(upload_id): Path<String>,
) -> Result<Json<DownloadResponse>> {
    let upload = require_upload(&state, &upload_id).await?;

    // Sign first so a missing object does not leave a history row behind
    let signed = state
        .store()
        .signed_url(&upload.storage_key, state.signed_url_ttl())
        .await?;

    DownloadRepository::new(state.db())
        .record(&user.id, &upload.id)
        .await?;
    UploadRepository::new(state.db())
        .increment_downloads(&upload.id)
        .await?;

    tracing::debug!(upload_id = %upload.id, user_id = %user.id, "Download recorded");

    Ok(Json(DownloadResponse {
        upload_id: upload.id,
        file_name: upload.file_name,
        signed,
    }))
}

/// GET /api/downloads
async fn history(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DownloadEntry>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let entries = DownloadRepository::new(state.db())
        .list_for_user(&user.id, limit)
        .await?;
    Ok(Json(entries))
}

/// DELETE /api/downloads
async fn clear_history(State(state): State<AppState>, user: AuthUser) -> Result<Json<Cleared>> {
    let deleted = DownloadRepository::new(state.db())
        .clear_for_user(&user.id)
        .await?;
    Ok(Json(Cleared { deleted }))
}
