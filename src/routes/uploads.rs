//! Upload Routes
//!
//! Endpoints:
//! - POST /api/uploads - Multipart upload of a PDF or image into a class
//! - GET /api/uploads - Search uploads
//! - GET /api/uploads/recent - Newest uploads
//! - GET /api/uploads/:id - Upload metadata
//! - PUT /api/uploads/:id - Edit metadata (owner or admin)
//! - DELETE /api/uploads/:id - Delete upload and stored file (owner or admin)
//! - GET /api/uploads/:id/url - Signed URL for the stored file

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ai::{AiSource, AnalyzeInput, Category};
use crate::auth::AuthUser;
use crate::db::{
    ClassRepository, NewUpload, NotificationKind, NotificationRepository, UpdateUpload, Upload,
    UploadFilter, UploadRepository,
};
use crate::error::{AppError, Result};
use crate::routes::classes::require_class;
use crate::state::AppState;
use crate::storage::{upload_key, SignedUrl};
use super::extract::{Json, Query};

const MAX_TAGS: usize = 12;
const MAX_TAG_LEN: usize = 40;

/// Create the uploads router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(search_uploads).post(create_upload))
        .route("/recent", get(recent_uploads))
        .route("/:id", get(get_upload).put(update_upload).delete(delete_upload))
        .route("/:id/url", get(signed_url))
        // Leave headroom for the multipart envelope and text fields
        .layer(DefaultBodyLimit::max(max_upload_bytes + 1024 * 1024))
}

/// Fields collected from the multipart body
#[derive(Default)]
struct UploadForm {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Option<Vec<u8>>,
    class_id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    category: Option<String>,
    tags: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::error!("Failed to read multipart field: {}", e);
            AppError::BadRequest(format!("Failed to read upload: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                form.file_name = field.file_name().map(|s| s.to_string());
                form.content_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::error!("Failed to read file data: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                form.data = Some(bytes.to_vec());
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid field {}: {}", name, e)))?;
            let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());

            match name.as_str() {
                "class_id" => form.class_id = value,
                "title" => form.title = value,
                "summary" => form.summary = value,
                "category" => form.category = value,
                "tags" => form.tags = value,
                other => tracing::debug!("Ignoring multipart field '{}'", other),
            }
        }

        Ok(form)
    }
}

/// Accept PDFs and images only
pub(crate) fn resolve_mime_type(file_name: &str, declared: Option<&str>) -> Option<String> {
    let declared = declared
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    let mime = declared.unwrap_or_else(|| {
        mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string()
    });

    if mime == "application/pdf" || mime.starts_with("image/") {
        Some(mime)
    } else {
        None
    }
}

/// Parse tags given as a JSON array or a comma-separated list
pub(crate) fn parse_tags(raw: &str) -> Vec<String> {
    let candidates: Vec<String> = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(_) => raw.split(',').map(|s| s.to_string()).collect(),
    };

    normalize_tags(candidates)
}

fn normalize_tags(candidates: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in candidates {
        let tag: String = tag.trim().chars().take(MAX_TAG_LEN).collect();
        if !tag.is_empty() && !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

fn parse_category(raw: &str) -> Result<Category> {
    Category::parse(raw).ok_or_else(|| AppError::BadRequest(format!("Unknown category: {}", raw)))
}

/// POST /api/uploads
async fn create_upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Upload>)> {
    let form = UploadForm::read(multipart).await?;

    let data = form
        .data
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    let max = state.config().uploads.max_bytes;
    if data.len() > max {
        return Err(AppError::PayloadTooLarge { size: data.len(), max });
    }

    let file_name = form.file_name.unwrap_or_else(|| "upload".to_string());
    let mime_type = resolve_mime_type(&file_name, form.content_type.as_deref()).ok_or_else(|| {
        AppError::BadRequest("Only PDF and image files are allowed".to_string())
    })?;

    let class_id = form
        .class_id
        .ok_or_else(|| AppError::BadRequest("class_id is required".to_string()))?;
    let class = require_class(&state, &class_id).await?;

    let category = form.category.as_deref().map(parse_category).transpose()?;
    let tags = form.tags.as_deref().map(parse_tags);

    // Only ask the analyzer when the student left something blank
    let needs_analysis = form.title.is_none()
        || form.summary.is_none()
        || category.is_none()
        || tags.as_ref().map_or(true, |t| t.is_empty());

    let (title, summary, category, tags) = if needs_analysis {
        let (insights, source) = state
            .ai()
            .analyze(&AnalyzeInput {
                file_name: file_name.clone(),
                mime_type: Some(mime_type.clone()),
                text: None,
                data: Some(data.clone()),
            })
            .await;
        tracing::debug!(?source, "Upload metadata analyzed");

        (
            form.title.unwrap_or(insights.title),
            Some(form.summary.unwrap_or(insights.summary)),
            category.unwrap_or(insights.category),
            tags.filter(|t| !t.is_empty())
                .unwrap_or_else(|| normalize_tags(insights.tags)),
        )
    } else {
        (
            form.title.unwrap_or_default(),
            form.summary,
            category.unwrap_or(Category::Other),
            tags.unwrap_or_default(),
        )
    };

    let file_hash = hex::encode(Sha256::digest(&data));
    let file_size = data.len() as i64;
    let storage_key = upload_key(&class.id, &file_name);

    state
        .store()
        .put_object(&storage_key, data, &mime_type)
        .await?;

    let created = UploadRepository::new(state.db())
        .create(&NewUpload {
            class_id: class.id.clone(),
            user_id: user.id.clone(),
            title,
            summary,
            category: category.as_str().to_string(),
            tags,
            file_name,
            mime_type,
            file_size,
            file_hash,
            storage_key: storage_key.clone(),
        })
        .await;

    let upload = match created {
        Ok(upload) => upload,
        Err(e) => {
            if let Err(cleanup) = state.store().delete_object(&storage_key).await {
                tracing::warn!(key = %storage_key, "Failed to remove orphaned object: {}", cleanup);
            }
            return Err(e);
        }
    };

    notify_class_members(&state, &upload, &class.code, &user).await;

    tracing::info!(
        upload_id = %upload.id,
        class_id = %upload.class_id,
        file_size = upload.file_size,
        "Upload stored"
    );

    Ok((StatusCode::CREATED, Json(upload)))
}

/// Tell every other class member about a new upload; failures are logged only
async fn notify_class_members(state: &AppState, upload: &Upload, class_code: &str, uploader: &AuthUser) {
    let members = match ClassRepository::new(state.db()).member_ids(&upload.class_id).await {
        Ok(members) => members,
        Err(e) => {
            tracing::warn!(upload_id = %upload.id, "Could not load class members: {}", e);
            return;
        }
    };

    let message = format!("{} uploaded \"{}\" to {}", uploader.username, upload.title, class_code);
    let notifications = NotificationRepository::new(state.db());
    for member in members.iter().filter(|m| **m != uploader.id) {
        if let Err(e) = notifications
            .create(member, NotificationKind::NewUpload, &message, Some(&upload.id))
            .await
        {
            tracing::warn!(user_id = %member, "Failed to create notification: {}", e);
        }
    }
}

/// Fetch an upload or 404
pub(crate) async fn require_upload(state: &AppState, id: &str) -> Result<Upload> {
    UploadRepository::new(state.db())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Upload not found: {}", id)))
}

/// GET /api/uploads
async fn search_uploads(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(filter): Query<UploadFilter>,
) -> Result<Json<Vec<Upload>>> {
    let uploads = UploadRepository::new(state.db()).search(&filter).await?;
    Ok(Json(uploads))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<i64>,
}

/// GET /api/uploads/recent
async fn recent_uploads(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<Upload>>> {
    let filter = UploadFilter {
        limit: Some(query.limit.unwrap_or(20)),
        ..Default::default()
    };
    let uploads = UploadRepository::new(state.db()).search(&filter).await?;
    Ok(Json(uploads))
}

/// GET /api/uploads/:id
async fn get_upload(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Upload>> {
    Ok(Json(require_upload(&state, &id).await?))
}

/// PUT /api/uploads/:id
async fn update_upload(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(mut data): Json<UpdateUpload>,
) -> Result<Json<Upload>> {
    let upload = require_upload(&state, &id).await?;
    if !user.can_modify(&upload.user_id) {
        return Err(AppError::Forbidden("Not authorized to edit this upload".to_string()));
    }

    if matches!(data.title.as_deref(), Some(t) if t.trim().is_empty()) {
        return Err(AppError::BadRequest("Title cannot be empty".to_string()));
    }
    if let Some(category) = data.category.take() {
        data.category = Some(parse_category(&category)?.as_str().to_string());
    }
    data.tags = data.tags.take().map(normalize_tags);

    let updated = UploadRepository::new(state.db())
        .update(&id, &data)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Upload not found: {}", id)))?;
    Ok(Json(updated))
}

/// DELETE /api/uploads/:id
async fn delete_upload(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let upload = require_upload(&state, &id).await?;
    if !user.can_modify(&upload.user_id) {
        return Err(AppError::Forbidden("Not authorized to delete this upload".to_string()));
    }

    remove_upload(&state, &upload).await?;
    tracing::info!(upload_id = %id, by = %user.id, "Upload deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete the row, then the stored object
pub(crate) async fn remove_upload(state: &AppState, upload: &Upload) -> Result<()> {
    UploadRepository::new(state.db()).delete(&upload.id).await?;

    if let Err(e) = state.store().delete_object(&upload.storage_key).await {
        tracing::warn!(key = %upload.storage_key, "Stored file not removed: {}", e);
    }
    Ok(())
}

#[derive(Serialize)]
struct SignedUrlResponse {
    #[serde(flatten)]
    signed: SignedUrl,
    file_name: String,
    mime_type: String,
}

/// GET /api/uploads/:id/url
async fn signed_url(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SignedUrlResponse>> {
    let upload = require_upload(&state, &id).await?;
    let signed = state
        .store()
        .signed_url(&upload.storage_key, state.signed_url_ttl())
        .await?;

    Ok(Json(SignedUrlResponse {
        signed,
        file_name: upload.file_name,
        mime_type: upload.mime_type,
    }))
}
