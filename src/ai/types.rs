//! AI Types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Material category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Exam,
    Notes,
    Homework,
    Lab,
    Slides,
    StudyGuide,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Exam,
        Category::Notes,
        Category::Homework,
        Category::Lab,
        Category::Slides,
        Category::StudyGuide,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Exam => "exam",
            Category::Notes => "notes",
            Category::Homework => "homework",
            Category::Lab => "lab",
            Category::Slides => "slides",
            Category::StudyGuide => "study_guide",
            Category::Other => "other",
        }
    }

    /// Lenient parse accepting spaces, dashes and any case
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
    }
}

/// AI-derived upload metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInsights {
    pub title: String,
    pub summary: String,
    pub category: Category,
    pub tags: Vec<String>,
}

/// Input to document analysis
#[derive(Debug, Clone, Default)]
pub struct AnalyzeInput {
    pub file_name: String,
    pub mime_type: Option<String>,
    /// Extracted or user-supplied text
    pub text: Option<String>,
    /// Raw file bytes, sent inline when the provider supports it
    pub data: Option<Vec<u8>>,
}

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of an in-document chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// AI provider errors
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Provider not configured")]
    NotConfigured,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_lenient() {
        assert_eq!(Category::parse("Study Guide"), Some(Category::StudyGuide));
        assert_eq!(Category::parse("study-guide"), Some(Category::StudyGuide));
        assert_eq!(Category::parse(" EXAM "), Some(Category::Exam));
        assert_eq!(Category::parse("poster"), None);
    }
}
