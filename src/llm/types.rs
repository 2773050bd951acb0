use serde::{Deserialize, Serialize};

use crate::core::cost::CostUsd;

/// Output of one completion call, with provider-side usage accounting.
///
/// Latency is deliberately absent: the orchestrator measures wall-clock time
/// around the adapter invocation rather than trusting provider-reported
/// figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub cost_usd: CostUsd,
    pub provider: String,
    pub model: String,
}
