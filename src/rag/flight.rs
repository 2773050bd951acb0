//! Per-fingerprint single-flight coordination.
//!
//! At most one answer computation runs per fingerprint; concurrent callers
//! for the same fingerprint await that computation instead of duplicating
//! the generation call. The computation itself runs in a spawned task, so a
//! waiter dropping out (client disconnect) never cancels it for the others.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::types::AnswerResponse;
use crate::core::errors::ApiError;

pub type FlightOutcome = Arc<Result<AnswerResponse, ApiError>>;
type OutcomeRx = watch::Receiver<Option<FlightOutcome>>;
type OutcomeTx = watch::Sender<Option<FlightOutcome>>;

pub enum Flight {
    /// This caller starts the computation and publishes the outcome.
    Leader { tx: OutcomeTx, rx: OutcomeRx },
    /// Another caller is already computing; await its outcome.
    Joiner(OutcomeRx),
}

#[derive(Default)]
pub struct FlightGroup {
    flights: Mutex<HashMap<String, OutcomeRx>>,
}

impl FlightGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: &str) -> Flight {
        let mut flights = self.flights.lock().expect("flight map lock");
        if let Some(rx) = flights.get(key) {
            return Flight::Joiner(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        flights.insert(key.to_string(), rx.clone());
        Flight::Leader { tx, rx }
    }

    /// Remove the in-flight entry; later callers consult the cache again.
    pub fn finish(&self, key: &str) {
        self.flights.lock().expect("flight map lock").remove(key);
    }
}

/// Wait until the flight's outcome is published.
pub async fn wait(mut rx: OutcomeRx) -> Result<FlightOutcome, ApiError> {
    loop {
        let published = rx.borrow_and_update().clone();
        if let Some(outcome) = published {
            return Ok(outcome);
        }
        if rx.changed().await.is_err() {
            return Err(ApiError::GenerationFailed(
                "in-flight computation was abandoned".to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_caller_joins_the_flight() {
        let group = FlightGroup::new();
        assert!(matches!(group.begin("key"), Flight::Leader { .. }));
        assert!(matches!(group.begin("key"), Flight::Joiner(_)));

        group.finish("key");
        assert!(matches!(group.begin("key"), Flight::Leader { .. }));
    }

    #[tokio::test]
    async fn waiters_receive_the_published_outcome() {
        let group = Arc::new(FlightGroup::new());
        let Flight::Leader { tx, rx } = group.begin("key") else {
            panic!("expected leader");
        };

        let waiter = tokio::spawn(wait(rx));
        tx.send(Some(Arc::new(Err(ApiError::NoCandidates))))
            .expect("publish");

        let outcome = waiter.await.expect("join").expect("wait");
        assert!(matches!(outcome.as_ref(), Err(ApiError::NoCandidates)));
    }

    #[tokio::test]
    async fn dropped_leader_unblocks_waiters_with_an_error() {
        let group = FlightGroup::new();
        let Flight::Leader { tx, rx } = group.begin("key") else {
            panic!("expected leader");
        };

        drop(tx);
        let err = wait(rx).await.unwrap_err();
        assert!(matches!(err, ApiError::GenerationFailed(_)));
    }
}
