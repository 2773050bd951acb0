use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::Settings;
use crate::core::paths::AppPaths;
use crate::llm::OpenAiProvider;
use crate::rag::cache::{MemoryCacheStore, ResponseCache};
use crate::rag::prompt::PromptComposer;
use crate::rag::query_log::SqliteQueryLog;
use crate::rag::store::{self, SqliteChunkStore};
use crate::rag::AskService;

/// Process-wide dependencies, constructed once at startup and injected into
/// the orchestrator. Everything is read-only after initialization.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<Settings>,
    pub ask: AskService,
    #[allow(dead_code)]
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Arc::new(Settings::load(&paths));

        let pool = store::connect(&paths.db_path).await?;
        let chunks = Arc::new(SqliteChunkStore::new(pool.clone()).await?);
        let query_log = Arc::new(SqliteQueryLog::new(pool).await?);
        let llm = Arc::new(OpenAiProvider::new(&settings)?);
        let cache = ResponseCache::new(Arc::new(MemoryCacheStore::new()), settings.cache_ttl());
        let composer = PromptComposer::from_paths(&paths);

        let ask = AskService::new(chunks, llm, cache, query_log, composer, &settings);

        Ok(Arc::new(AppState {
            paths,
            settings,
            ask,
            started_at: Utc::now(),
        }))
    }
}
