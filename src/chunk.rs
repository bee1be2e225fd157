//! Character-window text splitter.
//!
//! Splits document text into pieces of at most `chunk_size` characters, with
//! `chunk_overlap` characters repeated between neighbours. Cut points prefer a
//! paragraph break, then a line break, then whitespace, and only fall back to
//! a hard cut when none exists in the back half of the window.
//!
//! Each chunk receives a UUID plus a SHA-256 hash of its text, which the
//! retriever uses to skip passages that are already indexed.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Metadata;

/// A piece of a loaded document, ready to be embedded.
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub hash: String,
}

/// Split `text` and attach `base` metadata plus a `chunk_index` to each piece.
pub fn chunk_document(
    text: &str,
    base: &Metadata,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<TextChunk> {
    split_text(text, chunk_size, chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(i, content)| {
            let mut metadata = base.clone();
            metadata.insert("chunk_index".to_string(), i.to_string());
            TextChunk {
                id: Uuid::new_v4().to_string(),
                hash: content_hash(&content),
                content,
                metadata,
            }
        })
        .collect()
}

/// Split text into overlapping windows. Returns no chunks for blank input.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
        if start >= chars.len() {
            break;
        }

        let hard_end = (start + chunk_size).min(chars.len());
        let end = if hard_end == chars.len() {
            hard_end
        } else {
            find_break(&chars, start, hard_end)
        };

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end == chars.len() {
            break;
        }

        // Always make progress, even when overlap >= the piece just emitted.
        let next = end.saturating_sub(chunk_overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

fn find_break(chars: &[char], start: usize, end: usize) -> usize {
    let floor = start + (end - start) / 2;

    let paragraph = (floor..end)
        .rev()
        .find(|&i| i > 0 && chars[i] == '\n' && chars[i - 1] == '\n');
    if let Some(i) = paragraph {
        return i + 1;
    }
    if let Some(i) = (floor..end).rev().find(|&i| chars[i] == '\n') {
        return i + 1;
    }
    if let Some(i) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
        return i + 1;
    }
    end
}

/// Hex SHA-256 of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
