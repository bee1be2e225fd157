//! Core data models that flow between the retriever, the web search client,
//! and the query controller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Provenance attached to an indexed passage (e.g. `source` → file path).
pub type Metadata = BTreeMap<String, String>;

/// Number of characters kept in a source preview.
pub const PREVIEW_CHARS: usize = 200;

/// An immutable query and its per-call options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub max_results: usize,
    pub force_web_search: bool,
    pub include_sources: bool,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_results: 5,
            force_web_search: false,
            include_sources: true,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn force_web(mut self, force: bool) -> Self {
        self.force_web_search = force;
        self
    }

    pub fn include_sources(mut self, include: bool) -> Self {
        self.include_sources = include;
        self
    }
}

/// One passage returned by a similarity lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub content: String,
    pub metadata: Metadata,
    /// Non-negative distance to the query; lower is more similar.
    pub distance: f64,
}

/// User-facing projection of a retrieved or fetched passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceRecord {
    Local {
        content: String,
        metadata: Metadata,
        score: f64,
    },
    Web(WebSource),
}

impl SourceRecord {
    /// Build a local source with a bounded content preview.
    pub fn from_candidate(candidate: &Candidate) -> Self {
        SourceRecord::Local {
            content: preview(&candidate.content, PREVIEW_CHARS),
            metadata: candidate.metadata.clone(),
            score: candidate.distance,
        }
    }
}

/// First `max_chars` characters of `text` followed by `"..."`.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// The local retriever's answer for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOutcome {
    pub response: String,
    pub sources: Vec<SourceRecord>,
    /// Advisory score in `[0.0, 1.0]`, monotonic in mean similarity.
    pub confidence: f64,
}

impl RetrievalOutcome {
    pub fn empty() -> Self {
        Self {
            response: "No relevant information found in local database.".to_string(),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Degraded outcome describing why the lookup failed.
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            response: format!("Error searching local database: {}", reason),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// A single external search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default = "no_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

fn untitled() -> String {
    "Untitled".to_string()
}

fn no_url() -> String {
    "#".to_string()
}

/// The web search client's answer. Both fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebOutcome {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sources: Vec<WebSource>,
}

impl WebOutcome {
    /// Aggregated text. Only an empty string counts as absent; whitespace
    /// is passed through as-is.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

/// Which path produced a [`QueryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Rag,
    McpWeb,
    Error,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Rag => "rag",
            SearchMethod::McpWeb => "mcp_web",
            SearchMethod::Error => "error",
        }
    }
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final output of one controller call. Built once and returned by value.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub response: String,
    pub sources: Vec<SourceRecord>,
    pub confidence: f64,
    pub search_method: SearchMethod,
    pub execution_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_chars() {
        let text = "é".repeat(300);
        let p = preview(&text, PREVIEW_CHARS);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_preview_short_text_still_marked() {
        assert_eq!(preview("short", PREVIEW_CHARS), "short...");
    }

    #[test]
    fn test_web_outcome_defaults() {
        let outcome: WebOutcome =
            serde_json::from_str(r#"{"sources": [{"snippet": "x"}]}"#).unwrap();
        assert!(outcome.content().is_none());
        assert_eq!(outcome.sources[0].title, "Untitled");
        assert_eq!(outcome.sources[0].url, "#");

        let outcome: WebOutcome = serde_json::from_str("{}").unwrap();
        assert_eq!(outcome, WebOutcome::default());
    }

    #[test]
    fn test_only_empty_content_is_absent() {
        let empty = WebOutcome {
            content: Some(String::new()),
            sources: Vec::new(),
        };
        assert!(empty.content().is_none());

        let blank = WebOutcome {
            content: Some("   ".to_string()),
            sources: Vec::new(),
        };
        assert_eq!(blank.content(), Some("   "));
    }

    #[test]
    fn test_search_method_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SearchMethod::McpWeb).unwrap(),
            "\"mcp_web\""
        );
        assert_eq!(SearchMethod::Rag.to_string(), "rag");
    }

    #[test]
    fn test_source_record_untagged() {
        let local = SourceRecord::Local {
            content: "abc...".to_string(),
            metadata: Metadata::from([("source".to_string(), "a.txt".to_string())]),
            score: 0.25,
        };
        let json = serde_json::to_value(&local).unwrap();
        assert_eq!(json["metadata"]["source"], "a.txt");
        assert_eq!(json["score"], 0.25);

        let web = SourceRecord::Web(WebSource {
            title: "Rust".to_string(),
            url: "https://www.rust-lang.org".to_string(),
            snippet: None,
        });
        let json = serde_json::to_value(&web).unwrap();
        assert_eq!(json["title"], "Rust");
        assert!(json.get("snippet").is_none());
    }
}
