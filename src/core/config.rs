//! Runtime settings for providers, pricing, and the response cache.
//!
//! Settings come from environment variables with optional `config.yml`
//! overrides; environment wins. Everything here is read-only after startup
//! and handed into the orchestrator by reference.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const DEFAULT_PRICE_IN_PER_1K: f64 = 0.30;
const DEFAULT_PRICE_OUT_PER_1K: f64 = 1.20;
const DEFAULT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Per-1K-token prices for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Default for ModelPricing {
    fn default() -> Self {
        ModelPricing {
            input_per_1k: DEFAULT_PRICE_IN_PER_1K,
            output_per_1k: DEFAULT_PRICE_OUT_PER_1K,
        }
    }
}

/// Pricing lookup with a catch-all default for unknown models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingTable {
    #[serde(default)]
    pub default: ModelPricing,
    #[serde(default)]
    pub models: HashMap<String, ModelPricing>,
}

impl PricingTable {
    pub fn for_model(&self, model: &str) -> &ModelPricing {
        self.models.get(model).unwrap_or(&self.default)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub default_model: String,
    pub embedding_model: String,
    pub pricing: PricingTable,
    pub cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
}

/// Optional `config.yml` shape. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    cache_ttl_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    pricing: Option<PricingTable>,
}

impl Settings {
    pub fn load(paths: &AppPaths) -> Self {
        let file = load_file_settings(paths);

        let mut pricing = file.pricing.unwrap_or_default();
        if let Some(price) = env_f64("OPENAI_PRICE_IN") {
            pricing.default.input_per_1k = price;
        }
        if let Some(price) = env_f64("OPENAI_PRICE_OUT") {
            pricing.default.output_per_1k = price;
        }

        Settings {
            openai_base_url: env_string("OPENAI_BASE_URL")
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_api_key: env_string("OPENAI_API_KEY"),
            default_model: env_string("OPENAI_MODEL")
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_model: env_string("OPENAI_EMBEDDING_MODEL")
                .or(file.embedding_model)
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            pricing,
            cache_ttl_secs: env_u64("VERDICTVAULT_CACHE_TTL_SECS")
                .or(file.cache_ttl_secs)
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            request_timeout_secs: env_u64("VERDICTVAULT_REQUEST_TIMEOUT_SECS")
                .or(file.request_timeout_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn load_file_settings(paths: &AppPaths) -> FileSettings {
    let raw = match fs::read_to_string(&paths.config_path) {
        Ok(raw) => raw,
        Err(_) => return FileSettings::default(),
    };

    match serde_yaml::from_str(&raw) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {}; using defaults",
                paths.config_path.display(),
                err
            );
            FileSettings::default()
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.trim().is_empty())
}

fn env_u64(name: &str) -> Option<u64> {
    env_string(name).and_then(|val| val.parse().ok())
}

fn env_f64(name: &str) -> Option<f64> {
    env_string(name).and_then(|val| val.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_falls_back_to_default() {
        let mut table = PricingTable::default();
        table.models.insert(
            "gpt-4o".to_string(),
            ModelPricing {
                input_per_1k: 2.5,
                output_per_1k: 10.0,
            },
        );

        assert_eq!(table.for_model("gpt-4o").input_per_1k, 2.5);
        assert_eq!(
            table.for_model("unknown-model").input_per_1k,
            DEFAULT_PRICE_IN_PER_1K
        );
    }

    #[test]
    fn file_settings_accept_partial_yaml() {
        let parsed: FileSettings = serde_yaml::from_str("model: gpt-4o\n").expect("parse");
        assert_eq!(parsed.model.as_deref(), Some("gpt-4o"));
        assert!(parsed.pricing.is_none());
    }
}
