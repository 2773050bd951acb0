//! Chunk store: read access to ingested document chunks.
//!
//! Document upload, parsing, and chunk embedding are owned by a separate
//! ingestion subsystem; the answer pipeline only reads. `insert_chunk` is
//! the seam that subsystem writes through.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::core::errors::ApiError;

/// An ingested chunk with its precomputed embedding.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub document_id: Uuid,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// All chunks that have embeddings, in stable `(document_id, chunk_index)`
    /// enumeration order. The order is the tie-break basis for ranking.
    async fn list_chunks_with_embeddings(&self) -> Result<Vec<DocumentChunk>, ApiError>;
}

pub async fn connect(db_path: &Path) -> Result<SqlitePool, ApiError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(ApiError::internal)
}

pub struct SqliteChunkStore {
    pool: SqlitePool,
}

impl SqliteChunkStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, ApiError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS document_chunks (
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (document_id, chunk_index)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<(), ApiError> {
        let blob = serialize_embedding(&chunk.embedding);

        sqlx::query(
            "INSERT OR REPLACE INTO document_chunks (document_id, chunk_index, content, embedding)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(chunk.document_id.to_string())
        .bind(chunk.chunk_index)
        .bind(&chunk.content)
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn list_chunks_with_embeddings(&self) -> Result<Vec<DocumentChunk>, ApiError> {
        let rows = sqlx::query(
            "SELECT document_id, chunk_index, content, embedding
             FROM document_chunks
             WHERE embedding IS NOT NULL AND LENGTH(embedding) > 0
             ORDER BY document_id, chunk_index",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut chunks = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw_id: String = row.get("document_id");
            let document_id = match Uuid::parse_str(&raw_id) {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!("skipping chunk with malformed document_id {}: {}", raw_id, err);
                    continue;
                }
            };
            let embedding_bytes: Vec<u8> = row.get("embedding");

            chunks.push(DocumentChunk {
                document_id,
                chunk_index: row.get("chunk_index"),
                content: row.get("content"),
                embedding: deserialize_embedding(&embedding_bytes),
            });
        }

        Ok(chunks)
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
