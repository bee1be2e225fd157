//! In-memory vector index.
//!
//! A flat list of embedded passages searched by brute-force squared L2 distance.
//! The retriever treats a [`VectorIndex`] as an immutable snapshot: mutation
//! happens on a clone which is then swapped in whole.

use std::collections::HashSet;

use crate::embedding::squared_l2_distance;
use crate::error::{RetrievalError, StorageError};
use crate::models::{Candidate, Metadata};

/// One embedded passage.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    /// SHA-256 of `content`, used to skip re-adding identical passages.
    pub hash: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    model: Option<String>,
    dims: Option<usize>,
    entries: Vec<IndexEntry>,
    hashes: HashSet<String>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Default::default()
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Append an entry. Returns `Ok(false)` if identical content is already indexed.
    pub fn insert(&mut self, entry: IndexEntry) -> Result<bool, StorageError> {
        match self.dims {
            Some(expected) if expected != entry.embedding.len() => {
                return Err(StorageError::DimensionMismatch {
                    expected,
                    actual: entry.embedding.len(),
                });
            }
            None => self.dims = Some(entry.embedding.len()),
            _ => {}
        }
        if !self.hashes.insert(entry.hash.clone()) {
            return Ok(false);
        }
        self.entries.push(entry);
        Ok(true)
    }

    /// Return up to `k` candidates ordered by ascending distance.
    ///
    /// Ties keep insertion order, so repeated lookups are deterministic.
    pub fn similarity_search(
        &self,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<Candidate>, RetrievalError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(dims) = self.dims {
            if dims != query_vec.len() {
                return Err(RetrievalError::Lookup(format!(
                    "query vector has {} dimensions, index has {}",
                    query_vec.len(),
                    dims
                )));
            }
        }

        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, squared_l2_distance(query_vec, &e.embedding)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| {
                let entry = &self.entries[i];
                Candidate {
                    content: entry.content.clone(),
                    metadata: entry.metadata.clone(),
                    distance,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::content_hash;

    fn entry(content: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: content.to_string(),
            content: content.to_string(),
            metadata: Metadata::new(),
            hash: content_hash(content),
            embedding,
        }
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = VectorIndex::new("test");
        assert!(index.similarity_search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_results_ascending_by_distance() {
        let mut index = VectorIndex::new("test");
        index.insert(entry("far", vec![0.0, 1.0])).unwrap();
        index.insert(entry("near", vec![1.0, 0.0])).unwrap();
        index.insert(entry("mid", vec![1.0, 1.0])).unwrap();

        let results = index.similarity_search(&[1.0, 0.0], 10).unwrap();
        let order: Vec<&str> = results.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(order, vec!["near", "mid", "far"]);
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_truncates_to_k() {
        let mut index = VectorIndex::new("test");
        for i in 0..10 {
            index
                .insert(entry(&format!("doc {}", i), vec![1.0, i as f32]))
                .unwrap();
        }
        assert_eq!(index.similarity_search(&[1.0, 0.0], 3).unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_content_skipped() {
        let mut index = VectorIndex::new("test");
        assert!(index.insert(entry("same", vec![1.0, 0.0])).unwrap());
        assert!(!index.insert(entry("same", vec![1.0, 0.0])).unwrap());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = VectorIndex::new("test");
        index.insert(entry("a", vec![1.0, 0.0])).unwrap();
        assert!(index.insert(entry("b", vec![1.0, 0.0, 0.0])).is_err());
        assert!(index.similarity_search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_distance_is_squared_euclidean() {
        let mut index = VectorIndex::new("test");
        index.insert(entry("close", vec![0.75, 0.661_437_8])).unwrap();
        index.insert(entry("mid", vec![1.0, 1.0])).unwrap();

        let results = index.similarity_search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].content, "close");
        assert!((results[0].distance - 0.5).abs() < 1e-6, "got {}", results[0].distance);
        assert!((results[1].distance - 1.0).abs() < 1e-9);
    }
}
