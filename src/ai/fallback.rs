//! Deterministic metadata used when no AI provider answers

use super::types::{AnalyzeInput, Category, DocumentInsights};

pub const FALLBACK_CHAT_REPLY: &str =
    "Sorry, the study assistant is unavailable right now. Please try again later.";

const UNTITLED: &str = "Untitled Upload";
const MAX_TAGS: usize = 5;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "pdf", "png", "jpg", "jpeg", "scan",
    "copy", "img", "file", "version",
];

/// Turn a file name into a display title
///
/// `"bio_210-midterm.review.pdf"` becomes `"Bio 210 Midterm Review"`.
pub fn clean_title(file_name: &str) -> String {
    let stem = strip_extension(file_name);

    let title = words(stem)
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

/// Guess a category from keywords in the file name and text
pub fn infer_category(file_name: &str, text: Option<&str>) -> Category {
    let mut tokens: Vec<String> = words(strip_extension(file_name))
        .map(|w| w.to_lowercase())
        .collect();
    if let Some(text) = text {
        tokens.extend(words(text).take(200).map(|w| w.to_lowercase()));
    }

    let has = |word: &str| tokens.iter().any(|t| t == word);
    let has_pair = |a: &str, b: &str| tokens.windows(2).any(|w| w[0] == a && w[1] == b);

    if has_pair("study", "guide") || has("review") || has("cheatsheet") {
        Category::StudyGuide
    } else if has("exam") || has("midterm") || has("final") || has("quiz") {
        Category::Exam
    } else if has("homework") || has("hw") || has("assignment") || has("pset") {
        Category::Homework
    } else if has("lab") {
        Category::Lab
    } else if has("slides") || has("lecture") || has("ppt") {
        Category::Slides
    } else if has("notes") || has("note") {
        Category::Notes
    } else {
        Category::Other
    }
}

/// Significant lowercase words of the file name
pub fn infer_tags(file_name: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for word in words(strip_extension(file_name)) {
        let word = word.to_lowercase();
        if word.len() < 3 || STOPWORDS.contains(&word.as_str()) || tags.contains(&word) {
            continue;
        }
        tags.push(word);
        if tags.len() == MAX_TAGS {
            break;
        }
    }

    tags
}

/// Full fallback metadata for an upload
pub fn fallback_insights(input: &AnalyzeInput) -> DocumentInsights {
    let title = clean_title(&input.file_name);
    let category = infer_category(&input.file_name, input.text.as_deref());

    DocumentInsights {
        summary: format!("{} ({})", title, category.as_str().replace('_', " ")),
        title,
        category,
        tags: infer_tags(&input.file_name),
    }
}

fn strip_extension(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && (1..=5).contains(&ext.len()) => stem,
        _ => base,
    }
}

fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}
