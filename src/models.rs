//! Data models passed between the pipeline stages.
//!
//! Every value here lives for a single run only:
//! - [`ArticleReference`]: link found on the front-page listing
//! - [`ArticleContent`]: title and body scraped from the article page
//! - [`SummaryPayload`]: the model's structured explanation
//! - [`RenderedDocument`]: the HTML fragment that gets published
//! - [`PostDraft`]: everything the blog API needs to create a post

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Placeholder used when the article page has no title container.
pub const MISSING_TITLE: &str = "❌ 제목 없음";
/// Placeholder used when the article page has no body container.
pub const MISSING_BODY: &str = "❌ 본문 없음";

/// The first article linked from a publisher's front page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleReference {
    pub url: String,
}

/// Plain-text article content.
///
/// Either field may hold [`MISSING_TITLE`] / [`MISSING_BODY`] when the page
/// did not contain the expected markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub title: String,
    pub body: String,
}

/// A child-friendly explanation of one article, as returned by the model.
///
/// All seven fields are required; see [`SummaryPayload::REQUIRED_FIELDS`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SummaryPayload {
    pub title: String,
    pub summary: String,
    pub meaning: String,
    pub importance: String,
    pub impact_on_us: String,
    pub food_for_thought: String,
    pub key_terms: Vec<KeyTerm>,
}

impl SummaryPayload {
    /// Field names in the order they are validated.
    pub const REQUIRED_FIELDS: [&'static str; 7] = [
        "title",
        "summary",
        "meaning",
        "importance",
        "impact_on_us",
        "food_for_thought",
        "key_terms",
    ];
}

/// A glossary entry surfaced by the model.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct KeyTerm {
    pub term: String,
    pub definition: String,
}

/// Rendered HTML fragment, immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument(String);

impl RenderedDocument {
    pub(crate) fn new(html: String) -> Self {
        Self(html)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenderedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A blog post ready to be sent to the content API.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub writer: String,
    pub image_paths: Vec<PathBuf>,
    pub thumbnail_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_payload_deserialization() {
        let json = r#"{
            "title": "T",
            "summary": "S",
            "meaning": "M",
            "importance": "I",
            "impact_on_us": "U",
            "food_for_thought": "F",
            "key_terms": [{"term": "GDP", "definition": "국내총생산"}]
        }"#;

        let payload: SummaryPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.title, "T");
        assert_eq!(payload.key_terms.len(), 1);
        assert_eq!(payload.key_terms[0].term, "GDP");
    }

    #[test]
    fn test_key_term_requires_definition() {
        let result: Result<KeyTerm, _> = serde_json::from_str(r#"{"term": "GDP"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_required_fields_order() {
        assert_eq!(SummaryPayload::REQUIRED_FIELDS[0], "title");
        assert_eq!(SummaryPayload::REQUIRED_FIELDS[2], "meaning");
        assert_eq!(SummaryPayload::REQUIRED_FIELDS[6], "key_terms");
    }
}
