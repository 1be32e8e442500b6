//! AI Providers
//!
//! Defines the provider trait and the Gemini implementation.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::types::{AiError, AnalyzeInput, ChatRole, ChatTurn, DocumentInsights};
use crate::config::AiConfig;
use crate::db::CardContent;

/// Largest file sent inline to the provider
const MAX_INLINE_BYTES: usize = 15 * 1024 * 1024;

/// AI provider trait
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Derive title, summary, category and tags for a file
    async fn analyze(&self, input: &AnalyzeInput) -> Result<DocumentInsights, AiError>;

    /// Answer a question about a document
    async fn chat(&self, context: &str, history: &[ChatTurn], message: &str) -> Result<String, AiError>;

    /// Generate study cards from a document
    async fn flashcards(&self, context: &str, count: usize) -> Result<Vec<CardContent>, AiError>;
}

/// Google Gemini provider
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Loose shape of the analysis JSON the model returns
#[derive(Deserialize)]
struct RawInsights {
    title: Option<String>,
    summary: Option<String>,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: api_key.to_string(),
        }
    }

    /// Call generateContent and return the first candidate's text
    async fn generate(&self, contents: serde_json::Value, json_output: bool) -> Result<String, AiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url,
            self.model,
            urlencoding::encode(&self.api_key)
        );

        let mut request = json!({ "contents": contents });
        if json_output {
            request["generationConfig"] = json!({ "responseMimeType": "application/json" });
        }

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::ApiError(format!("Failed to call Gemini: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::ApiError(format!("Gemini returned {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AiError::InvalidResponse("Empty candidate list".to_string()))
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze(&self, input: &AnalyzeInput) -> Result<DocumentInsights, AiError> {
        let prompt = format!(
            "You are helping college students organize study materials. Analyze the file \"{}\" \
             and respond with JSON: {{\"title\": string, \"summary\": string (2-3 sentences), \
             \"category\": one of exam|notes|homework|lab|slides|study_guide|other, \
             \"tags\": array of up to 6 short lowercase topic tags}}.{}",
            input.file_name,
            input
                .text
                .as_deref()
                .map(|t| format!("\n\nDocument text:\n{}", truncate(t, 12_000)))
                .unwrap_or_default()
        );

        let mut parts = vec![json!({ "text": prompt })];
        if let (Some(data), Some(mime)) = (&input.data, &input.mime_type) {
            if data.len() <= MAX_INLINE_BYTES {
                parts.push(json!({
                    "inline_data": {
                        "mime_type": mime,
                        "data": base64::engine::general_purpose::STANDARD.encode(data),
                    }
                }));
            }
        }

        let text = self
            .generate(json!([{ "role": "user", "parts": parts }]), true)
            .await?;
        let raw: RawInsights = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| AiError::InvalidResponse(format!("Analysis was not JSON: {}", e)))?;

        Ok(normalize_insights(raw, input))
    }

    async fn chat(&self, context: &str, history: &[ChatTurn], message: &str) -> Result<String, AiError> {
        let mut contents = vec![json!({
            "role": "user",
            "parts": [{ "text": format!(
                "You are a study assistant answering questions about this document. \
                 Stay grounded in it and say so when it does not cover a question.\n\n{}",
                truncate(context, 20_000)
            ) }]
        })];

        for turn in history {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            contents.push(json!({ "role": role, "parts": [{ "text": turn.content }] }));
        }
        contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));

        let reply = self.generate(serde_json::Value::Array(contents), false).await?;
        Ok(reply.trim().to_string())
    }

    async fn flashcards(&self, context: &str, count: usize) -> Result<Vec<CardContent>, AiError> {
        let prompt = format!(
            "Create {} flashcards for studying the document below. Respond with a JSON array of \
             objects {{\"front\": question, \"back\": answer}}.\n\n{}",
            count,
            truncate(context, 20_000)
        );

        let text = self
            .generate(json!([{ "role": "user", "parts": [{ "text": prompt }] }]), true)
            .await?;
        let cards: Vec<CardContent> = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| AiError::InvalidResponse(format!("Flashcards were not JSON: {}", e)))?;

        Ok(cards
            .into_iter()
            .filter(|c| !c.front.trim().is_empty() && !c.back.trim().is_empty())
            .take(count)
            .collect())
    }
}

/// Fill gaps in model output from the deterministic analyzer
fn normalize_insights(raw: RawInsights, input: &AnalyzeInput) -> DocumentInsights {
    let fallback = super::fallback::fallback_insights(input);

    let mut tags: Vec<String> = Vec::new();
    for tag in raw.tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags.truncate(8);

    DocumentInsights {
        title: raw
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or(fallback.title),
        summary: raw
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback.summary),
        category: raw
            .category
            .as_deref()
            .and_then(super::types::Category::parse)
            .unwrap_or(fallback.category),
        tags: if tags.is_empty() { fallback.tags } else { tags },
    }
}

/// Models sometimes wrap JSON in a markdown fence
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub insights: Option<DocumentInsights>,
    pub reply: Option<String>,
}

#[cfg(test)]
#[async_trait]
impl AiProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn analyze(&self, _input: &AnalyzeInput) -> Result<DocumentInsights, AiError> {
        self.insights
            .clone()
            .ok_or_else(|| AiError::ApiError("mock failure".to_string()))
    }

    async fn chat(&self, _context: &str, _history: &[ChatTurn], _message: &str) -> Result<String, AiError> {
        self.reply
            .clone()
            .ok_or_else(|| AiError::ApiError("mock failure".to_string()))
    }

    async fn flashcards(&self, _context: &str, _count: usize) -> Result<Vec<CardContent>, AiError> {
        Err(AiError::ApiError("mock failure".to_string()))
    }
}
