//! TOML configuration parsing and validation.
//!
//! Every recognized option is an explicit field with a default. Unknown keys
//! are rejected by `serde(deny_unknown_fields)`, and [`load_config`] checks
//! ranges before anything is constructed.
//!
//! ```toml
//! [retrieval]
//! confidence_threshold = 0.7
//! max_results = 5
//! vector_db_path = "./data/vector_db"
//!
//! [chunking]
//! chunk_size = 1000
//! chunk_overlap = 200
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-ada-002"
//!
//! [synthesis]
//! provider = "openai"
//! model = "gpt-4-turbo-preview"
//! temperature = 0.7
//!
//! [web]
//! mcp_server_url = "http://localhost:8000/mcp"
//! timeout_secs = 20
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Minimum retrieval confidence for answering from the local index alone.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Directory holding the persisted index.
    #[serde(default = "default_vector_db_path")]
    pub vector_db_path: PathBuf,
    #[serde(default = "default_retrieval_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_results: default_max_results(),
            vector_db_path: default_vector_db_path(),
            timeout_secs: default_retrieval_timeout_secs(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.7
}
fn default_max_results() -> usize {
    5
}
fn default_vector_db_path() -> PathBuf {
    PathBuf::from("./data/vector_db")
}
fn default_retrieval_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (Ollama, or an OpenAI-compatible gateway).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SynthesisConfig {
    #[serde(default = "default_synthesis_provider")]
    pub provider: String,
    #[serde(default = "default_synthesis_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_synthesis_retries")]
    pub max_retries: u32,
    #[serde(default = "default_synthesis_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: default_synthesis_provider(),
            model: default_synthesis_model(),
            temperature: default_temperature(),
            url: None,
            max_retries: default_synthesis_retries(),
            timeout_secs: default_synthesis_timeout_secs(),
        }
    }
}

fn default_synthesis_provider() -> String {
    "openai".to_string()
}
fn default_synthesis_model() -> String {
    "gpt-4-turbo-preview".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_synthesis_retries() -> u32 {
    2
}
fn default_synthesis_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WebConfig {
    /// Base URL of the web search service (`{url}/search`, `{url}/health`).
    #[serde(default = "default_mcp_server_url")]
    pub mcp_server_url: String,
    #[serde(default = "default_web_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            mcp_server_url: default_mcp_server_url(),
            timeout_secs: default_web_timeout_secs(),
            health_timeout_secs: default_health_timeout_secs(),
        }
    }
}

fn default_mcp_server_url() -> String {
    "http://localhost:8000/mcp".to_string()
}
fn default_web_timeout_secs() -> u64 {
    20
}
fn default_health_timeout_secs() -> u64 {
    3
}

impl WebConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and provider names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.retrieval.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::invalid(
                "retrieval.confidence_threshold",
                format!("must be in [0.0, 1.0], got {}", threshold),
            ));
        }
        if self.retrieval.max_results == 0 {
            return Err(ConfigError::invalid("retrieval.max_results", "must be >= 1"));
        }
        if self.retrieval.timeout_secs == 0 {
            return Err(ConfigError::invalid("retrieval.timeout_secs", "must be > 0"));
        }

        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::invalid("chunking.chunk_size", "must be > 0"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::invalid(
                "chunking.chunk_overlap",
                format!(
                    "must be smaller than chunk_size ({}), got {}",
                    self.chunking.chunk_size, self.chunking.chunk_overlap
                ),
            ));
        }

        match self.embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" => {}
            other => {
                return Err(ConfigError::Provider(format!(
                    "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                    other
                )))
            }
        }
        if self.embedding.dims == Some(0) {
            return Err(ConfigError::invalid("embedding.dims", "must be > 0"));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::invalid("embedding.batch_size", "must be > 0"));
        }

        match self.synthesis.provider.as_str() {
            "openai" | "ollama" | "extractive" => {}
            other => {
                return Err(ConfigError::Provider(format!(
                    "Unknown synthesis provider: '{}'. Must be openai, ollama, or extractive.",
                    other
                )))
            }
        }
        if !(0.0..=2.0).contains(&self.synthesis.temperature) {
            return Err(ConfigError::invalid(
                "synthesis.temperature",
                format!("must be in [0.0, 2.0], got {}", self.synthesis.temperature),
            ));
        }
        if self.synthesis.timeout_secs == 0 {
            return Err(ConfigError::invalid("synthesis.timeout_secs", "must be > 0"));
        }

        if let Err(e) = reqwest::Url::parse(&self.web.mcp_server_url) {
            return Err(ConfigError::invalid(
                "web.mcp_server_url",
                format!("'{}' is not a valid URL: {}", self.web.mcp_server_url, e),
            ));
        }
        if self.web.timeout_secs == 0 {
            return Err(ConfigError::invalid("web.timeout_secs", "must be > 0"));
        }
        if self.web.health_timeout_secs == 0 {
            return Err(ConfigError::invalid("web.health_timeout_secs", "must be > 0"));
        }

        Ok(())
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval.timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis.timeout_secs)
    }
}

/// Read, parse, and validate a config file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Config::from_toml(&content)
}

/// Like [`load_config`], but falls back to defaults when `path` does not exist.
pub fn load_config_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}
