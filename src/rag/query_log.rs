//! Append-only query metrics log.
//!
//! One record per served request (cache hit, computed answer, or failure).
//! Aggregation (percentiles, rollups) is an external consumer's job; nothing
//! here reads the log back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::core::cost::CostUsd;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogRecord {
    pub user_id: String,
    pub query: String,
    pub provider: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: CostUsd,
    pub latency_ms: u64,
    pub cached: bool,
    pub failed: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait QueryLogSink: Send + Sync {
    async fn append(&self, record: QueryLogRecord) -> Result<(), ApiError>;
}

pub struct SqliteQueryLog {
    pool: SqlitePool,
}

impl SqliteQueryLog {
    pub async fn new(pool: SqlitePool) -> Result<Self, ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS query_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                query TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                tokens_in INTEGER NOT NULL,
                tokens_out INTEGER NOT NULL,
                cost_usd TEXT NOT NULL,
                latency_ms INTEGER NOT NULL,
                cached INTEGER NOT NULL,
                failed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl QueryLogSink for SqliteQueryLog {
    async fn append(&self, record: QueryLogRecord) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO query_logs
                (user_id, query, provider, model, tokens_in, tokens_out,
                 cost_usd, latency_ms, cached, failed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&record.user_id)
        .bind(&record.query)
        .bind(&record.provider)
        .bind(&record.model)
        .bind(record.tokens_in)
        .bind(record.tokens_out)
        .bind(record.cost_usd.to_string())
        .bind(record.latency_ms as i64)
        .bind(record.cached)
        .bind(record.failed)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }
}
