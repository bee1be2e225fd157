//! Error types for each component boundary.
//!
//! Every collaborator returns a `Result` with one of these enums. Which of
//! them degrade into data and which end a query is decided by the
//! [`QueryController`](crate::controller::QueryController):
//!
//! | Error | Raised by | Handling |
//! |-------|-----------|----------|
//! | [`RetrievalError`] | Local retriever | Zero-confidence outcome, web fallback |
//! | [`TransportError`] | Web search client | Empty web outcome, synthesis continues |
//! | [`SynthesisError`] | Synthesis provider | `search_method = "error"` result |
//! | [`ConfigError`] | Config loading | Fatal at startup |

use std::path::PathBuf;
use std::time::Duration;

/// Failures while looking up candidates in the local index.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("index lookup failed: {0}")]
    Lookup(String),

    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),

    #[error("retrieval task aborted: {0}")]
    Aborted(String),
}

/// Failures talking to the web search endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("web search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("web search returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("web search timed out after {0:?}")]
    Timeout(Duration),

    #[error("web search task aborted: {0}")]
    Aborted(String),
}

/// Failures from the language-synthesis collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("synthesis request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("synthesis API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid synthesis response: {0}")]
    InvalidResponse(String),

    #[error("synthesis is not configured: {0}")]
    NotConfigured(String),

    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),

    #[error("synthesis task aborted: {0}")]
    Aborted(String),
}

/// Failures while computing embeddings.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled")]
    Disabled,

    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding provider misconfigured: {0}")]
    Misconfigured(String),

    #[error("local embedding failed: {0}")]
    Local(String),
}

/// Failures while loading or saving the persisted index.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt index metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("index dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Invalid or unreadable configuration. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{0}")]
    Provider(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            message: message.into(),
        }
    }
}
