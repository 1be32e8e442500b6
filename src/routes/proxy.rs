//! File proxy routes
//!
//! Serves stored upload bytes through the API so viewers avoid cross-origin
//! fetches against the bucket.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::routes::uploads::require_upload;
use crate::state::AppState;

/// Create the proxy router
pub fn router() -> Router<AppState> {
    Router::new().route("/:upload_id", get(serve_upload))
}

/// `inline` disposition with an RFC 5987 encoded name for non-ASCII file names
pub(crate) fn inline_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') { c } else { '_' })
        .collect();

    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(file_name)
    )
}

/// GET /api/proxy/:upload_id
async fn serve_upload(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(upload_id): Path<String>,
) -> Result<Response> {
    let upload = require_upload(&state, &upload_id).await?;
    let object = state.store().get_object(&upload.storage_key).await?;

    let content_type = object
        .metadata
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| upload.mime_type.clone());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, object.data.len())
        .header(header::CONTENT_DISPOSITION, inline_disposition(&upload.file_name))
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from(object.data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_disposition() {
        assert_eq!(
            inline_disposition("notes.pdf"),
            "inline; filename=\"notes.pdf\"; filename*=UTF-8''notes.pdf"
        );

        let header = inline_disposition("résumé \"final\".pdf");
        assert!(header.starts_with("inline; filename=\"r_sum_ _final_.pdf\""));
        assert!(header.ends_with("filename*=UTF-8''r%C3%A9sum%C3%A9%20%22final%22.pdf"));
    }
}
