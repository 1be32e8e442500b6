//! AI Module
//!
//! Upload analysis (title, summary, category, tags), in-document chat and
//! flashcard generation. Every operation has a deterministic fallback so
//! callers never see a provider failure.

mod fallback;
mod provider;
mod service;
mod types;

pub use fallback::{clean_title, fallback_insights, infer_category, infer_tags, FALLBACK_CHAT_REPLY};
pub use provider::{AiProvider, GeminiProvider};
pub use service::{AiService, AiSource, MAX_FLASHCARDS};
pub use types::{AiError, AnalyzeInput, Category, ChatRole, ChatTurn, DocumentInsights};
