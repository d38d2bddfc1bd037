use axum::{extract::State, Json};
use serde::Serialize;
use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
    pub ledger: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_status = match state.store.ping().await {
        Ok(()) => format!("{}: connected", state.store.backend_name()),
        Err(err) => {
            tracing::warn!("Health check: store unreachable: {}", err);
            format!("{}: disconnected", state.store.backend_name())
        }
    };

    // Reachability of the chain is not probed; the ledger is optional.
    let ledger_status = match (state.ledger.is_enabled(), state.ledger.is_writable()) {
        (false, _) => "disabled",
        (true, false) => "read-only",
        (true, true) => "enabled",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store_status,
        ledger: ledger_status.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::test_state,
        db::{testing::FlakyStore, MemoryStore},
        services::{ledger::mock::MockLedger, DisabledLedger},
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn reports_store_and_ledger_state() {
        let state = test_state(Arc::new(MemoryStore::new()), Arc::new(MockLedger::new()));
        let Json(health) = health_check(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.store, "memory: connected");
        assert_eq!(health.ledger, "enabled");
    }

    #[tokio::test]
    async fn reports_disconnected_store() {
        let state = test_state(Arc::new(FlakyStore::down()), Arc::new(DisabledLedger));
        let Json(health) = health_check(State(state)).await;
        assert_eq!(health.store, "flaky: disconnected");
        assert_eq!(health.ledger, "disabled");
    }
}
