//! Local retriever: similarity lookup over the vector index plus the
//! distance-to-confidence scoring that drives the controller's gate.
//!
//! # Confidence
//!
//! ```text
//! confidence = max(0, 1 − mean(distance over returned candidates))
//! ```
//!
//! `0.0` when nothing is returned. The value is advisory: it only moves
//! monotonically with average similarity and is not a probability.
//!
//! # Index snapshots
//!
//! The live index sits behind `RwLock<Arc<VectorIndex>>`. Readers clone the
//! `Arc` and search that snapshot without holding any lock. Mutations are
//! serialized by an async mutex, build a new index from a clone, persist it,
//! and only then take the write lock to swap the handle. A search that
//! started before a mutation finishes keeps seeing the old index in full.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn, Span};

use crate::chunk::{chunk_document, TextChunk};
use crate::config::ChunkingConfig;
use crate::documents::load_paths;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::{RetrievalError, StorageError};
use crate::index::{IndexEntry, VectorIndex};
use crate::models::{Candidate, Metadata, RetrievalOutcome, SourceRecord};
use crate::storage::IndexStorage;

/// How many top candidates are stitched into the extractive response.
pub const RESPONSE_TOP_K: usize = 3;

/// The controller's view of a local knowledge source.
#[async_trait]
pub trait LocalSearch: Send + Sync {
    /// Look up `query`, reporting failures as errors.
    async fn retrieve(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<RetrievalOutcome, RetrievalError>;

    /// Look up `query`; failures become a zero-confidence outcome.
    async fn search(&self, query: &str, max_results: usize) -> RetrievalOutcome {
        match self.retrieve(query, max_results).await {
            Ok(outcome) => outcome,
            Err(e) => RetrievalOutcome::failed(e),
        }
    }

    /// Whether a one-result lookup succeeds.
    async fn is_healthy(&self) -> bool {
        self.retrieve("test", 1).await.is_ok()
    }
}

/// Counts reported by [`Retriever::add_documents`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub files_loaded: usize,
    pub chunks_added: usize,
    pub duplicates_skipped: usize,
    pub unsupported: Vec<PathBuf>,
}

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    storage: Arc<dyn IndexStorage>,
    path: PathBuf,
    chunking: ChunkingConfig,
    index: RwLock<Arc<VectorIndex>>,
    mutation: tokio::sync::Mutex<()>,
    span: Span,
}

impl Retriever {
    /// Load the index at `path`, creating and saving an empty one if none exists.
    pub async fn open(
        embedder: Arc<dyn EmbeddingProvider>,
        storage: Arc<dyn IndexStorage>,
        path: impl Into<PathBuf>,
        chunking: ChunkingConfig,
        span: Span,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        let index = load_or_create(storage.as_ref(), &path, embedder.model_name(), &span).await?;
        if let (Some(expected), Some(actual)) = (index.dims(), embedder.dims()) {
            if expected != actual {
                return Err(StorageError::DimensionMismatch { expected, actual });
            }
        }
        info!(parent: &span, path = %path.display(), chunks = index.len(), "retriever initialized");

        Ok(Self {
            embedder,
            storage,
            path,
            chunking,
            index: RwLock::new(Arc::new(index)),
            mutation: tokio::sync::Mutex::new(()),
            span,
        })
    }

    /// The index as of now. Later mutations do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<VectorIndex> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn swap(&self, next: VectorIndex) {
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    /// Load, chunk, embed, and index files or directories, then persist.
    ///
    /// Unsupported file types are skipped with a warning and listed in the
    /// report. Passages already in the index are not added twice.
    pub async fn add_documents(&self, paths: &[PathBuf]) -> anyhow::Result<AddReport> {
        let batch = load_paths(paths.to_vec()).await?;
        for path in &batch.unsupported {
            warn!(parent: &self.span, path = %path.display(), "unsupported file type, skipping");
        }

        let _guard = self.mutation.lock().await;
        let mut report = AddReport {
            files_loaded: batch.documents.len(),
            unsupported: batch.unsupported,
            ..AddReport::default()
        };
        let chunks = batch
            .documents
            .iter()
            .flat_map(|doc| {
                chunk_document(
                    &doc.text,
                    &doc.metadata,
                    self.chunking.chunk_size,
                    self.chunking.chunk_overlap,
                )
            })
            .collect();

        self.ingest_locked(chunks, &mut report).await?;
        Ok(report)
    }

    /// Index raw texts without touching the filesystem.
    pub async fn add_texts(&self, texts: Vec<(String, Metadata)>) -> anyhow::Result<AddReport> {
        let _guard = self.mutation.lock().await;
        let mut report = AddReport::default();
        let chunks = texts
            .iter()
            .flat_map(|(text, metadata)| {
                chunk_document(
                    text,
                    metadata,
                    self.chunking.chunk_size,
                    self.chunking.chunk_overlap,
                )
            })
            .collect();

        self.ingest_locked(chunks, &mut report).await?;
        Ok(report)
    }

    /// Embed `chunks`, append them to a copy of the index, save, and swap.
    /// Callers must hold `self.mutation`.
    async fn ingest_locked(
        &self,
        mut chunks: Vec<TextChunk>,
        report: &mut AddReport,
    ) -> anyhow::Result<()> {
        let current = self.snapshot();
        let before = chunks.len();
        let mut seen = HashSet::new();
        chunks.retain(|c| !current.contains_hash(&c.hash) && seen.insert(c.hash.clone()));
        report.duplicates_skipped += before - chunks.len();

        if chunks.is_empty() {
            debug!(parent: &self.span, "no new chunks to index");
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            anyhow::bail!(
                "embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            );
        }

        let mut next = (*current).clone();
        for (chunk, embedding) in chunks.into_iter().zip(vectors) {
            let added = next.insert(IndexEntry {
                id: chunk.id,
                content: chunk.content,
                metadata: chunk.metadata,
                hash: chunk.hash,
                embedding,
            })?;
            if added {
                report.chunks_added += 1;
            }
        }

        self.storage.save(&next, &self.path).await?;
        self.swap(next);

        info!(
            parent: &self.span,
            added = report.chunks_added,
            total = self.len(),
            "added document chunks to vector store"
        );
        Ok(())
    }

    /// Reload the index from storage and swap it in.
    pub async fn update_vector_store(&self) -> Result<(), StorageError> {
        let _guard = self.mutation.lock().await;
        let index = load_or_create(
            self.storage.as_ref(),
            &self.path,
            self.embedder.model_name(),
            &self.span,
        )
        .await?;
        let chunks = index.len();
        self.swap(index);
        info!(parent: &self.span, chunks, "vector store refreshed");
        Ok(())
    }
}

#[async_trait]
impl LocalSearch for Retriever {
    async fn retrieve(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let query_vec = embed_query(self.embedder.as_ref(), query).await?;
        let index = self.snapshot();
        let candidates = index.similarity_search(&query_vec, max_results)?;
        let outcome = build_outcome(&candidates);

        debug!(
            parent: &self.span,
            candidates = candidates.len(),
            confidence = outcome.confidence,
            "local lookup complete"
        );
        Ok(outcome)
    }
}

async fn load_or_create(
    storage: &dyn IndexStorage,
    path: &Path,
    model: &str,
    span: &Span,
) -> Result<VectorIndex, StorageError> {
    match storage.load(path).await? {
        Some(index) => {
            if let Some(stored) = index.model() {
                if stored != model {
                    warn!(parent: span, stored, configured = model, "index was built with a different embedding model");
                }
            }
            info!(parent: span, path = %path.display(), "loaded existing vector store");
            Ok(index)
        }
        None => {
            let index = VectorIndex::new(model);
            storage.save(&index, path).await?;
            info!(parent: span, path = %path.display(), "created new vector store");
            Ok(index)
        }
    }
}

/// `max(0, 1 − mean(distances))`, or `0.0` for no distances.
pub fn confidence_from_distances(distances: &[f64]) -> f64 {
    if distances.is_empty() {
        return 0.0;
    }
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    (1.0 - mean).clamp(0.0, 1.0)
}

/// Turn ranked candidates into a scored, attributed outcome.
pub fn build_outcome(candidates: &[Candidate]) -> RetrievalOutcome {
    if candidates.is_empty() {
        return RetrievalOutcome::empty();
    }

    let distances: Vec<f64> = candidates.iter().map(|c| c.distance).collect();
    let context = candidates
        .iter()
        .take(RESPONSE_TOP_K)
        .map(|c| c.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n");

    RetrievalOutcome {
        response: format!("Based on local documents:\n\n{}", context),
        sources: candidates.iter().map(SourceRecord::from_candidate).collect(),
        confidence: confidence_from_distances(&distances),
    }
}
