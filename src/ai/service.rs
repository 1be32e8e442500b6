//! AI Service
//!
//! Calls the configured provider and falls back to deterministic values when
//! it is missing or fails.

use std::sync::Arc;

use super::fallback::{fallback_insights, FALLBACK_CHAT_REPLY};
use super::provider::{AiProvider, GeminiProvider};
use super::types::{AnalyzeInput, ChatTurn, DocumentInsights};
use crate::config::AiConfig;
use crate::db::CardContent;

pub const MAX_FLASHCARDS: usize = 30;

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiSource {
    Provider,
    Fallback,
}

/// AI facade shared by the routes
#[derive(Clone, Default)]
pub struct AiService {
    provider: Option<Arc<dyn AiProvider>>,
}

impl AiService {
    /// Build from configuration; no API key means fallback only
    pub fn from_config(config: &AiConfig) -> Self {
        match &config.gemini_api_key {
            Some(key) => {
                tracing::info!("AI provider: gemini ({})", config.gemini_model);
                Self::with_provider(Arc::new(GeminiProvider::new(config, key)))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set, AI features use fallback values");
                Self::disabled()
            }
        }
    }

    pub fn with_provider(provider: Arc<dyn AiProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn disabled() -> Self {
        Self { provider: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Analyze a file, never failing
    pub async fn analyze(&self, input: &AnalyzeInput) -> (DocumentInsights, AiSource) {
        if let Some(provider) = &self.provider {
            match provider.analyze(input).await {
                Ok(insights) => return (insights, AiSource::Provider),
                Err(e) => tracing::warn!(
                    provider = provider.name(),
                    file_name = %input.file_name,
                    "AI analysis failed, using fallback: {}",
                    e
                ),
            }
        }

        (fallback_insights(input), AiSource::Fallback)
    }

    /// Answer a chat message, never failing
    pub async fn chat(&self, context: &str, history: &[ChatTurn], message: &str) -> (String, AiSource) {
        if let Some(provider) = &self.provider {
            match provider.chat(context, history, message).await {
                Ok(reply) if !reply.is_empty() => return (reply, AiSource::Provider),
                Ok(_) => tracing::warn!(provider = provider.name(), "AI chat returned an empty reply"),
                Err(e) => tracing::warn!(provider = provider.name(), "AI chat failed: {}", e),
            }
        }

        (FALLBACK_CHAT_REPLY.to_string(), AiSource::Fallback)
    }

    /// Generate flashcards; the fallback is an empty list
    pub async fn flashcards(&self, context: &str, count: usize) -> (Vec<CardContent>, AiSource) {
        let count = count.clamp(1, MAX_FLASHCARDS);

        if let Some(provider) = &self.provider {
            match provider.flashcards(context, count).await {
                Ok(cards) => return (cards, AiSource::Provider),
                Err(e) => tracing::warn!(provider = provider.name(), "Flashcard generation failed: {}", e),
            }
        }

        (Vec::new(), AiSource::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::MockProvider;
    use crate::ai::types::Category;

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let service = AiService::with_provider(Arc::new(MockProvider {
            insights: None,
            reply: None,
        }));
        let input = AnalyzeInput {
            file_name: "orgo_notes.pdf".into(),
            ..Default::default()
        };

        let (insights, source) = service.analyze(&input).await;
        assert_eq!(source, AiSource::Fallback);
        assert_eq!(insights.title, "Orgo Notes");
        assert_eq!(insights.category, Category::Notes);

        let (reply, source) = service.chat("ctx", &[], "what is SN2?").await;
        assert_eq!(source, AiSource::Fallback);
        assert_eq!(reply, FALLBACK_CHAT_REPLY);

        let (cards, _) = service.flashcards("ctx", 5).await;
        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn test_provider_success_is_used() {
        let expected = DocumentInsights {
            title: "Stereochemistry".into(),
            summary: "Chirality and R/S naming.".into(),
            category: Category::Notes,
            tags: vec!["chirality".into()],
        };
        let service = AiService::with_provider(Arc::new(MockProvider {
            insights: Some(expected.clone()),
            reply: Some("SN2 is a one-step substitution.".into()),
        }));

        let (insights, source) = service
            .analyze(&AnalyzeInput {
                file_name: "x.pdf".into(),
                ..Default::default()
            })
            .await;
        assert_eq!(source, AiSource::Provider);
        assert_eq!(insights, expected);

        let (reply, _) = service.chat("ctx", &[], "?").await;
        assert_eq!(reply, "SN2 is a one-step substitution.");
    }

    #[tokio::test]
    async fn test_disabled_service_uses_fallback() {
        let service = AiService::disabled();
        assert!(!service.is_enabled());
        let (_, source) = service
            .analyze(&AnalyzeInput {
                file_name: "a.pdf".into(),
                ..Default::default()
            })
            .await;
        assert_eq!(source, AiSource::Fallback);
    }
}
