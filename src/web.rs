//! Web search client.
//!
//! Talks to an external search service over HTTP:
//!
//! | Method | Path | Body / Response |
//! |--------|------|-----------------|
//! | `POST` | `{mcp_server_url}/search` | `{"query", "num_results"}` → `{"content"?, "sources"?}` |
//! | `GET`  | `{mcp_server_url}/health` | any 2xx is healthy |
//!
//! Missing `content` or `sources` in a response are tolerated; source
//! entries without a title or URL get `"Untitled"` and `"#"`.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn, Span};

use crate::config::WebConfig;
use crate::error::{ConfigError, TransportError};
use crate::models::WebOutcome;

/// The controller's view of an external search service.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<WebOutcome, TransportError>;

    /// Never fails; unreachable or slow services report `false`.
    async fn is_healthy(&self) -> bool;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
}

pub struct HttpWebSearchClient {
    base_url: String,
    timeout: Duration,
    health_timeout: Duration,
    client: reqwest::Client,
    span: Span,
}

impl HttpWebSearchClient {
    pub fn new(config: &WebConfig, span: Span) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Provider(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.mcp_server_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            health_timeout: config.health_timeout(),
            client,
            span,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Request(e)
        }
    }
}

#[async_trait]
impl WebSearch for HttpWebSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<WebOutcome, TransportError> {
        let url = format!("{}/search", self.base_url);
        debug!(parent: &self.span, %url, max_results, "sending web search request");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&SearchRequest {
                query,
                num_results: max_results,
            })
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let outcome: WebOutcome = response.json().await.map_err(|e| self.map_error(e))?;
        debug!(
            parent: &self.span,
            sources = outcome.sources.len(),
            has_content = outcome.content().is_some(),
            "web search complete"
        );
        Ok(outcome)
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(parent: &self.span, error = %e, "web search health check failed");
                false
            }
        }
    }
}
