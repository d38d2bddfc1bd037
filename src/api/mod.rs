// src/api/mod.rs
pub mod health;
pub mod ledger;
pub mod scores;

use std::sync::Arc;

use crate::config::Config;
use crate::db::ScoreStore;
use crate::services::{Leaderboard, LedgerMirror, Reconciler, RetryPolicy};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ScoreStore>,
    pub ledger: Arc<dyn LedgerMirror>,
    pub config: Config,
}

impl AppState {
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.store.clone(), RetryPolicy::from_config(&self.config))
    }

    pub fn leaderboard(&self) -> Leaderboard {
        Leaderboard::new(self.store.clone(), RetryPolicy::from_config(&self.config))
    }
}

#[cfg(test)]
pub(crate) fn test_state(
    store: Arc<dyn ScoreStore>,
    ledger: Arc<dyn LedgerMirror>,
) -> AppState {
    AppState {
        store,
        ledger,
        config: crate::config::test_config(),
    }
}
