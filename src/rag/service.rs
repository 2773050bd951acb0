//! Answer orchestration: cache lookup, retrieval, budgeting, composition,
//! generation, caching, and metrics logging.
//!
//! `AskService` is the sole caller of every other pipeline component and the
//! single point translating component failures for the caller. Each request
//! walks CacheLookup → (hit | retrieve → budget → compose → generate) →
//! LogAndReturn; misses for the same fingerprint share one computation.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use super::budget::trim_to_token_budget;
use super::cache::{fingerprint, ResponseCache};
use super::flight::{self, Flight, FlightGroup};
use super::prompt::PromptComposer;
use super::query_log::{QueryLogRecord, QueryLogSink};
use super::retrieval::rank_top_k;
use super::store::ChunkStore;
use super::types::{AnswerRequest, AnswerResponse, Citation};
use crate::core::config::Settings;
use crate::core::cost::CostUsd;
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

#[derive(Clone)]
pub struct AskService {
    chunks: Arc<dyn ChunkStore>,
    llm: Arc<dyn LlmProvider>,
    cache: ResponseCache,
    flights: Arc<FlightGroup>,
    query_log: Arc<dyn QueryLogSink>,
    composer: Arc<PromptComposer>,
    default_model: String,
}

impl AskService {
    pub fn new(
        chunks: Arc<dyn ChunkStore>,
        llm: Arc<dyn LlmProvider>,
        cache: ResponseCache,
        query_log: Arc<dyn QueryLogSink>,
        composer: PromptComposer,
        settings: &Settings,
    ) -> Self {
        Self {
            chunks,
            llm,
            cache,
            flights: Arc::new(FlightGroup::new()),
            query_log,
            composer: Arc::new(composer),
            default_model: settings.default_model.clone(),
        }
    }

    /// Serve one question for an externally-authenticated user.
    ///
    /// Cached answers are returned with `cached=true` without re-running
    /// generation; the stored entry itself is never mutated. Callers that
    /// join an in-flight computation also report `cached=true`; only the
    /// caller that triggered the computation reports `cached=false`.
    pub async fn ask(
        &self,
        user_id: &str,
        request: AnswerRequest,
    ) -> Result<AnswerResponse, ApiError> {
        request.validate()?;

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let key = fingerprint(user_id, &request.query, request.k, &model);

        if let Some(mut response) = self.cache.get(&key).await {
            response.cached = true;
            tracing::info!("cache hit for query: {:.50}", request.query);
            self.log_served(user_id, &request.query, &response).await;
            return Ok(response);
        }

        let (waited, joined) = match self.flights.begin(&key) {
            Flight::Leader { tx, rx } => {
                let service = self.clone();
                let leader_key = key.clone();
                let leader_request = request.clone();
                let leader_model = model.clone();
                // Detached so a disconnecting caller cannot cancel the
                // computation for other waiters.
                tokio::spawn(async move {
                    let outcome = service
                        .compute_answer(&leader_request, &leader_model, &leader_key)
                        .await;
                    service.flights.finish(&leader_key);
                    let _ = tx.send(Some(Arc::new(outcome)));
                });
                (flight::wait(rx).await, false)
            }
            Flight::Joiner(rx) => (flight::wait(rx).await, true),
        };

        let outcome = match waited {
            Ok(outcome) => outcome,
            Err(err) => {
                // The flight died without publishing (leader task panicked).
                self.flights.finish(&key);
                self.log_failure(user_id, &request.query, &model).await;
                return Err(err);
            }
        };

        match outcome.as_ref() {
            Ok(response) => {
                let mut response = response.clone();
                response.cached = joined;
                self.log_served(user_id, &request.query, &response).await;
                Ok(response)
            }
            Err(err) => {
                self.log_failure(user_id, &request.query, &model).await;
                Err(err.clone())
            }
        }
    }

    /// The miss path: retrieve, budget, compose, generate, cache.
    ///
    /// Never writes the cache on failure, and never reaches the generation
    /// provider when retrieval found nothing.
    async fn compute_answer(
        &self,
        request: &AnswerRequest,
        model: &str,
        key: &str,
    ) -> Result<AnswerResponse, ApiError> {
        // Another flight may have landed between this caller's cache lookup
        // and its takeoff; re-check before spending on providers.
        if let Some(response) = self.cache.get(key).await {
            return Ok(response);
        }

        let query_embedding = self
            .llm
            .embed(std::slice::from_ref(&request.query))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ApiError::EmbeddingUnavailable("embedding provider returned no vectors".to_string())
            })?;

        let chunks = self.chunks.list_chunks_with_embeddings().await?;
        let ranked = rank_top_k(&query_embedding, &chunks, request.k)?;

        let budgeted = trim_to_token_budget(ranked, request.max_context_tokens, model);
        if budgeted.is_empty() {
            // Unreachable when retrieval was non-empty; fail the same way.
            return Err(ApiError::NoCandidates);
        }

        let prompt = self.composer.compose(&request.query, &budgeted);

        let started = Instant::now();
        let completion = self.llm.complete(&prompt, Some(model)).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let citations: Vec<Citation> = budgeted.into_iter().map(Citation::from).collect();
        tracing::info!(
            "generated answer for query: {:.50} with {} citations",
            request.query,
            citations.len()
        );

        let response = AnswerResponse {
            answer: completion.text,
            citations,
            provider: completion.provider,
            model: completion.model,
            tokens_in: completion.tokens_in,
            tokens_out: completion.tokens_out,
            cost_usd: completion.cost_usd,
            latency_ms,
            cached: false,
        };

        self.cache.put(key, &response).await;
        Ok(response)
    }

    async fn log_served(&self, user_id: &str, query: &str, response: &AnswerResponse) {
        let record = QueryLogRecord {
            user_id: user_id.to_string(),
            query: query.to_string(),
            provider: response.provider.clone(),
            model: response.model.clone(),
            tokens_in: response.tokens_in,
            tokens_out: response.tokens_out,
            cost_usd: response.cost_usd,
            latency_ms: response.latency_ms,
            cached: response.cached,
            failed: false,
            created_at: Utc::now(),
        };
        if let Err(err) = self.query_log.append(record).await {
            tracing::warn!("failed to append query log record: {}", err);
        }
    }

    async fn log_failure(&self, user_id: &str, query: &str, model: &str) {
        let record = QueryLogRecord {
            user_id: user_id.to_string(),
            query: query.to_string(),
            provider: self.llm.name().to_string(),
            model: model.to_string(),
            tokens_in: 0,
            tokens_out: 0,
            cost_usd: CostUsd::ZERO,
            latency_ms: 0,
            cached: false,
            failed: true,
            created_at: Utc::now(),
        };
        if let Err(err) = self.query_log.append(record).await {
            tracing::warn!("failed to append query log record: {}", err);
        }
    }
}
