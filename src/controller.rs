//! Query controller: the RAG-first routing decision and answer fusion.
//!
//! ```text
//! START ─▶ RAG_ATTEMPTED ─┬─▶ RAG_ACCEPTED ───────────────────────▶ DONE
//!   │                     └─▶ WEB_FALLBACK ─▶ SYNTHESIZED ────────▶ DONE
//!   └──(force_web_search)──────▶ WEB_FALLBACK
//!                 any failure ─▶ ERROR (still a well-formed QueryResult)
//! ```
//!
//! Each collaborator call runs on its own task with its own timeout, so a
//! panic inside a collaborator is caught as a join error and handled like any
//! other failure of that step. A task that overruns its timeout is aborted.
//! Retrieval failures become a zero-confidence outcome and send the query to
//! the web; web failures become an empty web outcome and synthesis still runs.
//! Only a synthesis failure produces a `search_method = "error"` result.

use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{error, info, warn, Span};

use crate::config::Config;
use crate::error::{RetrievalError, SynthesisError, TransportError};
use crate::models::{Query, QueryResult, RetrievalOutcome, SearchMethod, SourceRecord, WebOutcome};
use crate::retriever::LocalSearch;
use crate::synthesis::{ContextBlock, SynthesisPrompt, Synthesizer};
use crate::web::WebSearch;

/// Confidence reported for every answer that went through web search.
pub const WEB_CONFIDENCE: f64 = 0.9;

/// Local answers must score strictly above this to be passed to synthesis
/// as context on the web path.
pub const LOCAL_CONTEXT_FLOOR: f64 = 0.3;

/// Per-collaborator time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub retrieval: Duration,
    pub web: Duration,
    pub synthesis: Duration,
}

impl Timeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retrieval: config.retrieval_timeout(),
            web: config.web.timeout(),
            synthesis: config.synthesis_timeout(),
        }
    }
}

/// Component status for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub retriever: bool,
    pub web_search: bool,
    pub synthesis: bool,
    pub synthesis_provider: String,
    pub timestamp: String,
}

/// An answer before `include_sources` and timing are applied.
struct Answer {
    response: String,
    sources: Vec<SourceRecord>,
    confidence: f64,
    method: SearchMethod,
}

pub struct QueryController {
    retriever: Arc<dyn LocalSearch>,
    web: Arc<dyn WebSearch>,
    synthesizer: Arc<dyn Synthesizer>,
    confidence_threshold: f64,
    timeouts: Timeouts,
    span: Span,
}

impl QueryController {
    pub fn new(
        retriever: Arc<dyn LocalSearch>,
        web: Arc<dyn WebSearch>,
        synthesizer: Arc<dyn Synthesizer>,
        confidence_threshold: f64,
        timeouts: Timeouts,
        span: Span,
    ) -> Self {
        info!(parent: &span, confidence_threshold, synthesis = synthesizer.name(), "query controller initialized");
        Self {
            retriever,
            web,
            synthesizer,
            confidence_threshold,
            timeouts,
            span,
        }
    }

    /// Answer `query`. Never fails; errors are reported in the result.
    pub async fn query(&self, query: Query) -> QueryResult {
        let start = Instant::now();

        match self.run(&query).await {
            Ok(answer) => QueryResult {
                response: answer.response,
                sources: if query.include_sources {
                    answer.sources
                } else {
                    Vec::new()
                },
                confidence: answer.confidence,
                search_method: answer.method,
                execution_time: start.elapsed(),
            },
            Err(e) => {
                error!(parent: &self.span, error = %e, "error processing query");
                QueryResult {
                    response: format!(
                        "I apologize, but I encountered an error processing your query: {}",
                        e
                    ),
                    sources: Vec::new(),
                    confidence: 0.0,
                    search_method: SearchMethod::Error,
                    execution_time: start.elapsed(),
                }
            }
        }
    }

    async fn run(&self, query: &Query) -> Result<Answer, SynthesisError> {
        let local = if query.force_web_search {
            info!(parent: &self.span, "web search forced, skipping local retrieval");
            None
        } else {
            let outcome = self.retrieve(query).await;
            if outcome.confidence >= self.confidence_threshold {
                info!(parent: &self.span, confidence = outcome.confidence, "query answered from local documents");
                return Ok(Answer {
                    response: outcome.response,
                    sources: outcome.sources,
                    confidence: outcome.confidence,
                    method: SearchMethod::Rag,
                });
            }
            info!(
                parent: &self.span,
                confidence = outcome.confidence,
                threshold = self.confidence_threshold,
                "local confidence too low, falling back to web search"
            );
            Some(outcome)
        };

        let web = self.web_search(query).await;
        let prompt = fusion_prompt(&query.text, local.as_ref(), &web);

        let synthesizer = self.synthesizer.clone();
        let response = match isolated(self.timeouts.synthesis, async move {
            synthesizer.generate(&prompt).await
        })
        .await
        {
            Isolated::Done(result) => result?,
            Isolated::Aborted(reason) => return Err(SynthesisError::Aborted(reason)),
            Isolated::TimedOut => return Err(SynthesisError::Timeout(self.timeouts.synthesis)),
        };

        Ok(Answer {
            response,
            sources: web.sources.into_iter().map(SourceRecord::Web).collect(),
            confidence: WEB_CONFIDENCE,
            method: SearchMethod::McpWeb,
        })
    }

    async fn retrieve(&self, query: &Query) -> RetrievalOutcome {
        let retriever = self.retriever.clone();
        let (text, max_results) = (query.text.clone(), query.max_results);
        let result = match isolated(self.timeouts.retrieval, async move {
            retriever.retrieve(&text, max_results).await
        })
        .await
        {
            Isolated::Done(result) => result,
            Isolated::Aborted(reason) => Err(RetrievalError::Aborted(reason)),
            Isolated::TimedOut => Err(RetrievalError::Timeout(self.timeouts.retrieval)),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(parent: &self.span, error = %e, "local retrieval failed");
                RetrievalOutcome::failed(e)
            }
        }
    }

    async fn web_search(&self, query: &Query) -> WebOutcome {
        let web = self.web.clone();
        let (text, max_results) = (query.text.clone(), query.max_results);
        let result = match isolated(self.timeouts.web, async move {
            web.search(&text, max_results).await
        })
        .await
        {
            Isolated::Done(result) => result,
            Isolated::Aborted(reason) => Err(TransportError::Aborted(reason)),
            Isolated::TimedOut => Err(TransportError::Timeout(self.timeouts.web)),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(parent: &self.span, error = %e, "web search failed, continuing without web results");
                WebOutcome::default()
            }
        }
    }

    /// Check each component. Checks run concurrently and are time-bounded.
    pub async fn health(&self) -> HealthReport {
        let retriever = self.retriever.clone();
        let web = self.web.clone();
        let (retriever, web_search) = tokio::join!(
            isolated(self.timeouts.retrieval, async move { retriever.is_healthy().await }),
            isolated(self.timeouts.web, async move { web.is_healthy().await }),
        );

        HealthReport {
            retriever: matches!(retriever, Isolated::Done(true)),
            web_search: matches!(web_search, Isolated::Done(true)),
            synthesis: true,
            synthesis_provider: self.synthesizer.name().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

enum Isolated<T> {
    Done(T),
    Aborted(String),
    TimedOut,
}

/// Run `work` on its own task, bounded by `limit`. The task is aborted if
/// the limit passes first.
async fn isolated<T, F>(limit: Duration, work: F) -> Isolated<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    let task = tokio::spawn(work);
    let abort = task.abort_handle();
    match timeout(limit, task).await {
        Ok(Ok(value)) => Isolated::Done(value),
        Ok(Err(e)) => Isolated::Aborted(join_failure(e)),
        Err(_) => {
            abort.abort();
            Isolated::TimedOut
        }
    }
}

fn join_failure(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload: Box<dyn Any + Send> = e.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}

/// Collect the context that goes to synthesis on the web path.
pub fn fusion_prompt(
    query: &str,
    local: Option<&RetrievalOutcome>,
    web: &WebOutcome,
) -> SynthesisPrompt {
    let mut blocks = Vec::new();
    if let Some(local) = local.filter(|l| l.confidence > LOCAL_CONTEXT_FLOOR) {
        blocks.push(ContextBlock::local(local.response.clone()));
    }
    if let Some(content) = web.content() {
        blocks.push(ContextBlock::web(content));
    }
    SynthesisPrompt::new(query, blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metadata, WebSource};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockRetriever {
        confidence: f64,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockRetriever {
        fn scoring(confidence: f64) -> Self {
            Self {
                confidence,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                confidence: 0.0,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LocalSearch for MockRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<RetrievalOutcome, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RetrievalError::Lookup("index unavailable".to_string()));
            }
            Ok(RetrievalOutcome {
                response: "local answer".to_string(),
                sources: vec![SourceRecord::Local {
                    content: "local...".to_string(),
                    metadata: Metadata::new(),
                    score: 1.0 - self.confidence,
                }],
                confidence: self.confidence,
            })
        }
    }

    struct MockWeb {
        fail: bool,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockWeb {
        fn ok() -> Self {
            Self {
                fail: false,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WebSearch for MockWeb {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<WebOutcome, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(TransportError::Status {
                    status: 503,
                    body: "down".to_string(),
                });
            }
            Ok(WebOutcome {
                content: Some("web answer".to_string()),
                sources: vec![WebSource {
                    title: "Example".to_string(),
                    url: "https://example.com".to_string(),
                    snippet: None,
                }],
            })
        }

        async fn is_healthy(&self) -> bool {
            !self.fail
        }
    }

    #[derive(Default)]
    struct MockSynth {
        fail: bool,
        last_prompt: Mutex<Option<SynthesisPrompt>>,
    }

    #[async_trait]
    impl Synthesizer for MockSynth {
        fn name(&self) -> &str {
            "mock"
        }

        async fn generate(&self, prompt: &SynthesisPrompt) -> Result<String, SynthesisError> {
            *self.last_prompt.lock().unwrap() = Some(prompt.clone());
            if self.fail {
                return Err(SynthesisError::Api {
                    status: 500,
                    body: "model overloaded".to_string(),
                });
            }
            Ok(format!("synthesized from {} blocks", prompt.blocks.len()))
        }
    }

    struct PanickingRetriever;

    #[async_trait]
    impl LocalSearch for PanickingRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<RetrievalOutcome, RetrievalError> {
            panic!("index poisoned")
        }
    }

    struct PanickingWeb;

    #[async_trait]
    impl WebSearch for PanickingWeb {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<WebOutcome, TransportError> {
            panic!("malformed frame")
        }

        async fn is_healthy(&self) -> bool {
            panic!("health check blew up")
        }
    }

    struct PanickingSynth;

    #[async_trait]
    impl Synthesizer for PanickingSynth {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn generate(&self, _prompt: &SynthesisPrompt) -> Result<String, SynthesisError> {
            panic!("tokenizer exploded")
        }
    }

    /// Sleeps, then records that it ran to completion.
    struct SlowWeb {
        delay: Duration,
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WebSearch for SlowWeb {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<WebOutcome, TransportError> {
            tokio::time::sleep(self.delay).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(WebOutcome::default())
        }

        async fn is_healthy(&self) -> bool {
            true
        }
    }

    fn timeouts() -> Timeouts {
        Timeouts {
            retrieval: Duration::from_secs(5),
            web: Duration::from_secs(5),
            synthesis: Duration::from_secs(5),
        }
    }

    fn controller(
        retriever: Arc<MockRetriever>,
        web: Arc<MockWeb>,
        synth: Arc<MockSynth>,
        threshold: f64,
    ) -> QueryController {
        QueryController::new(retriever, web, synth, threshold, timeouts(), Span::none())
    }

    #[tokio::test]
    async fn test_confident_local_answer_skips_web() {
        let retriever = Arc::new(MockRetriever::scoring(0.85));
        let web = Arc::new(MockWeb::ok());
        let c = controller(retriever.clone(), web.clone(), Arc::new(MockSynth::default()), 0.7);

        let result = c.query(Query::new("what is rust?")).await;
        assert_eq!(result.search_method, SearchMethod::Rag);
        assert_eq!(result.response, "local answer");
        assert!((result.confidence - 0.85).abs() < 1e-9);
        assert_eq!(result.sources.len(), 1);
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
        assert_eq!(web.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let web = Arc::new(MockWeb::ok());
        let c = controller(
            Arc::new(MockRetriever::scoring(0.7)),
            web.clone(),
            Arc::new(MockSynth::default()),
            0.7,
        );
        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::Rag);
        assert_eq!(web.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_low_confidence_falls_back_to_web() {
        let web = Arc::new(MockWeb::ok());
        let synth = Arc::new(MockSynth::default());
        let c = controller(
            Arc::new(MockRetriever::scoring(0.5)),
            web.clone(),
            synth.clone(),
            0.8,
        );

        let result = c.query(Query::new("latest news")).await;
        assert_eq!(result.search_method, SearchMethod::McpWeb);
        assert_eq!(result.confidence, WEB_CONFIDENCE);
        assert_eq!(result.response, "synthesized from 2 blocks");
        assert_eq!(
            result.sources,
            vec![SourceRecord::Web(WebSource {
                title: "Example".to_string(),
                url: "https://example.com".to_string(),
                snippet: None,
            })]
        );
        assert_eq!(web.calls.load(Ordering::SeqCst), 1);

        let prompt = synth.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.blocks[0], ContextBlock::local("local answer"));
        assert_eq!(prompt.blocks[1], ContextBlock::web("web answer"));
    }

    #[tokio::test]
    async fn test_weak_local_context_is_dropped() {
        let synth = Arc::new(MockSynth::default());
        let c = controller(
            Arc::new(MockRetriever::scoring(0.3)),
            Arc::new(MockWeb::ok()),
            synth.clone(),
            0.7,
        );

        c.query(Query::new("q")).await;
        let prompt = synth.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.blocks, vec![ContextBlock::web("web answer")]);
    }

    #[tokio::test]
    async fn test_forced_web_never_calls_retriever() {
        let retriever = Arc::new(MockRetriever::scoring(0.95));
        let synth = Arc::new(MockSynth::default());
        let c = controller(retriever.clone(), Arc::new(MockWeb::ok()), synth.clone(), 0.7);

        let result = c.query(Query::new("q").force_web(true)).await;
        assert_eq!(result.search_method, SearchMethod::McpWeb);
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);

        let prompt = synth.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.blocks.len(), 1);
    }

    #[tokio::test]
    async fn test_sources_omitted_when_not_requested() {
        let c = controller(
            Arc::new(MockRetriever::scoring(0.9)),
            Arc::new(MockWeb::ok()),
            Arc::new(MockSynth::default()),
            0.7,
        );
        let rag = c.query(Query::new("q").include_sources(false)).await;
        assert_eq!(rag.search_method, SearchMethod::Rag);
        assert!(rag.sources.is_empty());

        let web = c
            .query(Query::new("q").include_sources(false).force_web(true))
            .await;
        assert_eq!(web.search_method, SearchMethod::McpWeb);
        assert!(web.sources.is_empty());
    }

    #[tokio::test]
    async fn test_retriever_failure_falls_back_to_web() {
        let web = Arc::new(MockWeb::ok());
        let synth = Arc::new(MockSynth::default());
        let c = controller(Arc::new(MockRetriever::failing()), web.clone(), synth.clone(), 0.7);

        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::McpWeb);
        assert_eq!(web.calls.load(Ordering::SeqCst), 1);

        let prompt = synth.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.blocks, vec![ContextBlock::web("web answer")]);
    }

    #[tokio::test]
    async fn test_web_failure_still_synthesizes() {
        let web = Arc::new(MockWeb {
            fail: true,
            ..MockWeb::ok()
        });
        let synth = Arc::new(MockSynth::default());
        let c = controller(Arc::new(MockRetriever::scoring(0.5)), web, synth.clone(), 0.7);

        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::McpWeb);
        assert!(result.sources.is_empty());
        assert_eq!(result.response, "synthesized from 1 blocks");
    }

    #[tokio::test]
    async fn test_web_timeout_degrades() {
        let web = Arc::new(MockWeb {
            delay: Some(Duration::from_secs(30)),
            ..MockWeb::ok()
        });
        let c = QueryController::new(
            Arc::new(MockRetriever::scoring(0.0)),
            web,
            Arc::new(MockSynth::default()),
            0.7,
            Timeouts {
                web: Duration::from_millis(50),
                ..timeouts()
            },
            Span::none(),
        );

        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::McpWeb);
        assert_eq!(result.response, "synthesized from 0 blocks");
        assert!(result.execution_time < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_error_result() {
        let synth = Arc::new(MockSynth {
            fail: true,
            ..Default::default()
        });
        let c = controller(
            Arc::new(MockRetriever::scoring(0.2)),
            Arc::new(MockWeb::ok()),
            synth,
            0.7,
        );

        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::Error);
        assert_eq!(result.confidence, 0.0);
        assert!(result.sources.is_empty());
        assert!(result
            .response
            .starts_with("I apologize, but I encountered an error processing your query:"));
        assert!(result.response.contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_synthesis_panic_is_error_result() {
        let c = QueryController::new(
            Arc::new(MockRetriever::scoring(0.2)),
            Arc::new(MockWeb::ok()),
            Arc::new(PanickingSynth),
            0.7,
            timeouts(),
            Span::none(),
        );

        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::Error);
        assert_eq!(result.confidence, 0.0);
        assert!(result
            .response
            .starts_with("I apologize, but I encountered an error processing your query:"));
        assert!(result.response.contains("tokenizer exploded"), "{}", result.response);
    }

    #[tokio::test]
    async fn test_retriever_panic_falls_back_to_web() {
        let web = Arc::new(MockWeb::ok());
        let synth = Arc::new(MockSynth::default());
        let c = QueryController::new(
            Arc::new(PanickingRetriever),
            web.clone(),
            synth.clone(),
            0.7,
            timeouts(),
            Span::none(),
        );

        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::McpWeb);
        assert_eq!(web.calls.load(Ordering::SeqCst), 1);
        let prompt = synth.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.blocks, vec![ContextBlock::web("web answer")]);
    }

    #[tokio::test]
    async fn test_web_panic_still_synthesizes() {
        let c = QueryController::new(
            Arc::new(MockRetriever::scoring(0.5)),
            Arc::new(PanickingWeb),
            Arc::new(MockSynth::default()),
            0.7,
            timeouts(),
            Span::none(),
        );

        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::McpWeb);
        assert_eq!(result.response, "synthesized from 1 blocks");
        assert!(result.sources.is_empty());

        let report = c.health().await;
        assert!(report.retriever);
        assert!(!report.web_search);
    }

    #[tokio::test]
    async fn test_timed_out_web_task_is_cancelled() {
        let finished = Arc::new(AtomicUsize::new(0));
        let c = QueryController::new(
            Arc::new(MockRetriever::scoring(0.0)),
            Arc::new(SlowWeb {
                delay: Duration::from_millis(300),
                finished: finished.clone(),
            }),
            Arc::new(MockSynth::default()),
            0.7,
            Timeouts {
                web: Duration::from_millis(20),
                ..timeouts()
            },
            Span::none(),
        );

        let result = c.query(Query::new("q")).await;
        assert_eq!(result.search_method, SearchMethod::McpWeb);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fusion_prompt_floor_is_strict() {
        let at_floor = RetrievalOutcome {
            response: "r".to_string(),
            sources: Vec::new(),
            confidence: LOCAL_CONTEXT_FLOOR,
        };
        let prompt = fusion_prompt("q", Some(&at_floor), &WebOutcome::default());
        assert!(prompt.blocks.is_empty());

        let empty_web = WebOutcome {
            content: Some(String::new()),
            sources: Vec::new(),
        };
        assert!(fusion_prompt("q", None, &empty_web).blocks.is_empty());
    }

    #[test]
    fn test_whitespace_web_content_still_forms_a_block() {
        let blank_web = WebOutcome {
            content: Some("   ".to_string()),
            sources: Vec::new(),
        };
        let prompt = fusion_prompt("q", None, &blank_web);
        assert_eq!(prompt.blocks, vec![ContextBlock::web("   ")]);
    }

    #[tokio::test]
    async fn test_health_report() {
        let c = controller(
            Arc::new(MockRetriever::scoring(0.5)),
            Arc::new(MockWeb {
                fail: true,
                ..MockWeb::ok()
            }),
            Arc::new(MockSynth::default()),
            0.7,
        );
        let report = c.health().await;
        assert!(report.retriever);
        assert!(!report.web_search);
        assert!(report.synthesis);
        assert_eq!(report.synthesis_provider, "mock");
        assert!(!report.timestamp.is_empty());
    }
}
