//! Index persistence.
//!
//! The [`IndexStorage`] trait is the retriever's only view of disk:
//! `load` returns `None` when nothing has been saved at a path yet, and
//! `save` replaces whatever was there.
//!
//! [`SqliteIndexStorage`] keeps the index in `{path}/index.sqlite`:
//!
//! | Table | Columns |
//! |-------|---------|
//! | `chunks` | `position`, `id`, `content`, `metadata_json`, `hash`, `embedding` (f32 LE BLOB) |
//! | `index_meta` | `key`, `value` (`model`, `dims`) |
//!
//! [`MemoryIndexStorage`] keeps saved snapshots in a map and is used by tests.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::StorageError;
use crate::index::{IndexEntry, VectorIndex};
use crate::models::Metadata;

/// File name of the SQLite database inside `vector_db_path`.
pub const INDEX_FILE: &str = "index.sqlite";

#[async_trait]
pub trait IndexStorage: Send + Sync {
    /// Load the index saved at `path`, or `None` if there is none.
    async fn load(&self, path: &Path) -> Result<Option<VectorIndex>, StorageError>;

    /// Persist `index` at `path`, replacing any previous contents.
    async fn save(&self, index: &VectorIndex, path: &Path) -> Result<(), StorageError>;
}

// ============ SQLite ============

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteIndexStorage;

impl SqliteIndexStorage {
    pub fn new() -> Self {
        Self
    }
}

async fn connect(db_path: &Path, create: bool) -> Result<SqlitePool, StorageError> {
    if create {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            position INTEGER PRIMARY KEY,
            id TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl IndexStorage for SqliteIndexStorage {
    async fn load(&self, path: &Path) -> Result<Option<VectorIndex>, StorageError> {
        let db_path = path.join(INDEX_FILE);
        if !db_path.exists() {
            return Ok(None);
        }

        let pool = connect(&db_path, false).await?;
        run_migrations(&pool).await?;

        let model: Option<String> =
            sqlx::query_scalar("SELECT value FROM index_meta WHERE key = 'model'")
                .fetch_optional(&pool)
                .await?;

        let rows = sqlx::query(
            "SELECT id, content, metadata_json, hash, embedding FROM chunks ORDER BY position",
        )
        .fetch_all(&pool)
        .await?;

        let mut index = match model {
            Some(m) => VectorIndex::new(m),
            None => VectorIndex::default(),
        };

        for row in &rows {
            let metadata_json: String = row.get("metadata_json");
            let metadata: Metadata = serde_json::from_str(&metadata_json)?;
            let blob: Vec<u8> = row.get("embedding");
            index.insert(IndexEntry {
                id: row.get("id"),
                content: row.get("content"),
                metadata,
                hash: row.get("hash"),
                embedding: blob_to_vec(&blob),
            })?;
        }

        pool.close().await;
        Ok(Some(index))
    }

    async fn save(&self, index: &VectorIndex, path: &Path) -> Result<(), StorageError> {
        let pool = connect(&path.join(INDEX_FILE), true).await?;
        run_migrations(&pool).await?;

        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM index_meta")
            .execute(&mut *tx)
            .await?;

        if let Some(model) = index.model() {
            sqlx::query("INSERT INTO index_meta (key, value) VALUES ('model', ?)")
                .bind(model)
                .execute(&mut *tx)
                .await?;
        }
        if let Some(dims) = index.dims() {
            sqlx::query("INSERT INTO index_meta (key, value) VALUES ('dims', ?)")
                .bind(dims.to_string())
                .execute(&mut *tx)
                .await?;
        }

        for (position, entry) in index.entries().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chunks (position, id, content, metadata_json, hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(&entry.id)
            .bind(&entry.content)
            .bind(serde_json::to_string(&entry.metadata)?)
            .bind(&entry.hash)
            .bind(vec_to_blob(&entry.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        pool.close().await;
        Ok(())
    }
}

// ============ In-memory ============

/// Keeps saved snapshots in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryIndexStorage {
    saved: Mutex<HashMap<PathBuf, VectorIndex>>,
}

impl MemoryIndexStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` snapshots currently held.
    pub fn saved_count(&self) -> usize {
        self.saved.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl IndexStorage for MemoryIndexStorage {
    async fn load(&self, path: &Path) -> Result<Option<VectorIndex>, StorageError> {
        let saved = self
            .saved
            .lock()
            .map_err(|_| std::io::Error::other("memory storage lock poisoned"))?;
        Ok(saved.get(path).cloned())
    }

    async fn save(&self, index: &VectorIndex, path: &Path) -> Result<(), StorageError> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| std::io::Error::other("memory storage lock poisoned"))?;
        saved.insert(path.to_path_buf(), index.clone());
        Ok(())
    }
}
