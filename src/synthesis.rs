//! Answer synthesis for the web-fallback path.
//!
//! The controller collects up to two labeled context blocks (local knowledge
//! and web search results) into a [`SynthesisPrompt`] and hands it to a
//! [`Synthesizer`]:
//!
//! - **[`OpenAISynthesizer`]**: `POST {base}/chat/completions`, retried on 429/5xx.
//! - **[`OllamaSynthesizer`]**: `POST {url}/api/chat` with `stream: false`.
//! - **[`ExtractiveSynthesizer`]**: offline; returns the context blocks as-is.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SynthesisConfig;
use crate::error::{ConfigError, SynthesisError};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

pub const LOCAL_KNOWLEDGE_LABEL: &str = "Local Knowledge";
pub const WEB_RESULTS_LABEL: &str = "Web Search Results";

/// One labeled piece of context, e.g. `Local Knowledge: ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    pub label: &'static str,
    pub text: String,
}

impl ContextBlock {
    pub fn local(text: impl Into<String>) -> Self {
        Self {
            label: LOCAL_KNOWLEDGE_LABEL,
            text: text.into(),
        }
    }

    pub fn web(text: impl Into<String>) -> Self {
        Self {
            label: WEB_RESULTS_LABEL,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.label, self.text)
    }
}

/// The query plus whatever context survived the controller's filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisPrompt {
    pub query: String,
    pub blocks: Vec<ContextBlock>,
}

impl SynthesisPrompt {
    pub fn new(query: impl Into<String>, blocks: Vec<ContextBlock>) -> Self {
        Self {
            query: query.into(),
            blocks,
        }
    }

    /// Context blocks joined by blank lines.
    pub fn context(&self) -> String {
        self.blocks
            .iter()
            .map(ContextBlock::to_string)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn system_message(&self) -> String {
        format!(
            "You are an AI assistant that answers questions by combining local knowledge \
             with real-time web search results.\n\n\
             Your task:\n\
             1. Synthesize information from both local and web sources\n\
             2. Provide accurate, up-to-date information\n\
             3. Clearly indicate when information comes from web sources\n\
             4. If sources conflict, prefer the more recent web information\n\
             5. Be concise but comprehensive\n\n\
             Context available: {}\n\n\
             User query: {}\n\n\
             Provide a well-structured response that addresses the query completely.",
            self.context(),
            self.query
        )
    }

    pub fn user_message(&self) -> &str {
        &self.query
    }
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Provider name for diagnostics (`"openai"`, `"ollama"`, `"extractive"`).
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &SynthesisPrompt) -> Result<String, SynthesisError>;
}

// ============ Extractive ============

/// Returns the labeled context verbatim. Needs no network access.
pub struct ExtractiveSynthesizer;

#[async_trait]
impl Synthesizer for ExtractiveSynthesizer {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, prompt: &SynthesisPrompt) -> Result<String, SynthesisError> {
        if prompt.blocks.is_empty() {
            return Ok(format!(
                "No local or web information was found for: {}",
                prompt.query
            ));
        }
        Ok(prompt.context())
    }
}

// ============ OpenAI ============

/// Chat completions against the OpenAI API. Requires `OPENAI_API_KEY`.
pub struct OpenAISynthesizer {
    model: String,
    temperature: f64,
    api_key: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAISynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ConfigError::Provider("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &SynthesisConfig, api_key: String) -> Result<Self, ConfigError> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_retries: config.max_retries,
            client: build_client(config)?,
        })
    }
}

#[async_trait]
impl Synthesizer for OpenAISynthesizer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &SynthesisPrompt) -> Result<String, SynthesisError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": prompt.system_message() },
                { "role": "user", "content": prompt.user_message() },
            ],
        });
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body);
        let json = send_with_retry(request, self.max_retries).await?;

        json.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(|c| c.trim().to_string())
            .ok_or_else(|| {
                SynthesisError::InvalidResponse("missing choices[0].message.content".to_string())
            })
    }
}

// ============ Ollama ============

pub struct OllamaSynthesizer {
    model: String,
    temperature: f64,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_retries: config.max_retries,
            client: build_client(config)?,
        })
    }
}

#[async_trait]
impl Synthesizer for OllamaSynthesizer {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, prompt: &SynthesisPrompt) -> Result<String, SynthesisError> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "options": { "temperature": self.temperature },
            "messages": [
                { "role": "system", "content": prompt.system_message() },
                { "role": "user", "content": prompt.user_message() },
            ],
        });
        let json = send_with_retry(self.client.post(&url).json(&body), self.max_retries).await?;

        json.pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(|c| c.trim().to_string())
            .ok_or_else(|| SynthesisError::InvalidResponse("missing message.content".to_string()))
    }
}

// ============ Shared ============

fn build_client(config: &SynthesisConfig) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ConfigError::Provider(format!("failed to build HTTP client: {}", e)))
}

/// Send a chat request, retrying 429/5xx/network failures with backoff.
async fn send_with_retry(
    request: reqwest::RequestBuilder,
    max_retries: u32,
) -> Result<serde_json::Value, SynthesisError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_secs(1 << (attempt - 1).min(5))).await;
        }

        let Some(attempt_request) = request.try_clone() else {
            return Err(SynthesisError::InvalidResponse(
                "request body cannot be retried".to_string(),
            ));
        };

        match attempt_request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body = response.text().await.unwrap_or_default();
                let err = SynthesisError::Api {
                    status: status.as_u16(),
                    body,
                };
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) => last_err = Some(SynthesisError::Request(e)),
        }
    }

    Err(last_err
        .unwrap_or_else(|| SynthesisError::InvalidResponse("no attempts were made".to_string())))
}

/// Create the [`Synthesizer`] named by `config.provider`.
pub fn create_synthesizer(config: &SynthesisConfig) -> Result<Arc<dyn Synthesizer>, ConfigError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAISynthesizer::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaSynthesizer::new(config)?)),
        "extractive" => Ok(Arc::new(ExtractiveSynthesizer)),
        other => Err(ConfigError::Provider(format!(
            "Unknown synthesis provider: {}",
            other
        ))),
    }
}
