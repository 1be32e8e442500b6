//! AI Routes
//!
//! Endpoints:
//! - POST /api/ai/analyze - Suggest title, summary, category and tags
//! - POST /api/ai/chat - Ask a question about an upload
//! - POST /api/ai/flashcards - Generate (unsaved) flashcards from an upload

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::ai::{AiSource, AnalyzeInput, Category, ChatTurn};
use crate::auth::AuthUser;
use crate::db::{CardContent, Upload};
use crate::error::{AppError, Result};
use crate::routes::uploads::require_upload;
use crate::state::AppState;
use super::extract::Json;

const DEFAULT_FLASHCARD_COUNT: usize = 10;
const MAX_CHAT_HISTORY: usize = 20;

/// Create the AI router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/chat", post(chat))
        .route("/flashcards", post(flashcards))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    file_name: String,
    mime_type: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    title: String,
    summary: String,
    category: Category,
    tags: Vec<String>,
    source: AiSource,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    upload_id: String,
    message: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
    source: AiSource,
}

#[derive(Debug, Deserialize)]
struct FlashcardRequest {
    upload_id: String,
    count: Option<usize>,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct FlashcardResponse {
    upload_id: String,
    cards: Vec<CardContent>,
    source: AiSource,
}

/// Grounding text for chat and flashcards
fn upload_context(upload: &Upload, text: Option<&str>) -> String {
    let mut context = format!(
        "Title: {}\nFile: {}\nCategory: {}\n",
        upload.title, upload.file_name, upload.category
    );
    if !upload.tags.is_empty() {
        context.push_str(&format!("Tags: {}\n", upload.tags.join(", ")));
    }
    if let Some(summary) = upload.summary.as_deref().filter(|s| !s.is_empty()) {
        context.push_str(&format!("Summary: {}\n", summary));
    }
    if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
        context.push_str("\nDocument text:\n");
        context.push_str(text);
    }
    context
}

/// POST /api/ai/analyze
async fn analyze(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    if request.file_name.trim().is_empty() {
        return Err(AppError::BadRequest("file_name is required".to_string()));
    }

    let (insights, source) = state
        .ai()
        .analyze(&AnalyzeInput {
            file_name: request.file_name,
            mime_type: request.mime_type,
            text: request.text,
            data: None,
        })
        .await;

    Ok(Json(AnalyzeResponse {
        title: insights.title,
        summary: insights.summary,
        category: insights.category,
        tags: insights.tags,
        source,
    }))
}

/// POST /api/ai/chat
async fn chat(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let upload = require_upload(&state, &request.upload_id).await?;
    let context = upload_context(&upload, request.text.as_deref());

    let history = &request.history;
    let history = &history[history.len().saturating_sub(MAX_CHAT_HISTORY)..];

    let (reply, source) = state.ai().chat(&context, history, message).await;
    Ok(Json(ChatResponse { reply, source }))
}

/// POST /api/ai/flashcards
async fn flashcards(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<FlashcardRequest>,
) -> Result<Json<FlashcardResponse>> {
    let upload = require_upload(&state, &request.upload_id).await?;
    let context = upload_context(&upload, request.text.as_deref());
    let count = request.count.unwrap_or(DEFAULT_FLASHCARD_COUNT);

    let (cards, source) = state.ai().flashcards(&context, count).await;
    Ok(Json(FlashcardResponse {
        upload_id: upload.id,
        cards,
        source,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_upload() -> Upload {
        Upload {
            id: "u1".into(),
            class_id: "c1".into(),
            user_id: "user".into(),
            uploader: "ada".into(),
            title: "Mendelian Genetics".into(),
            summary: Some("Punnett squares".into()),
            category: "notes".into(),
            tags: vec!["genetics".into(), "biology".into()],
            file_name: "genetics.pdf".into(),
            mime_type: "application/pdf".into(),
            file_size: 10,
            file_hash: String::new(),
            storage_key: String::new(),
            download_count: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_upload_context_includes_metadata_and_text() {
        let context = upload_context(&sample_upload(), Some("Dominant alleles mask recessive ones."));
        assert!(context.contains("Title: Mendelian Genetics"));
        assert!(context.contains("Tags: genetics, biology"));
        assert!(context.contains("Summary: Punnett squares"));
        assert!(context.ends_with("Dominant alleles mask recessive ones."));
    }

    #[test]
    fn test_upload_context_skips_blank_text() {
        let context = upload_context(&sample_upload(), Some("   "));
        assert!(!context.contains("Document text"));
    }
}
