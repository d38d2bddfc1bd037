use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod db;
mod error;
mod models;
mod services;

use config::{Config, StoreBackend};
use constants::API_VERSION;
use db::{Database, MemoryStore, ScoreStore};
use services::{DisabledLedger, EvmLedger, LedgerMirror};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snake_scores=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting Snake score backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!("Store failure policy: {:?}", config.store_failure_policy);

    let store = build_store(&config).await?;
    let ledger = build_ledger(&config)?;

    let app_state = api::AppState {
        store,
        ledger,
        config: config.clone(),
    };

    let app = build_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ScoreStore>> {
    match config.score_store {
        StoreBackend::Postgres => {
            let db = Database::new(config).await?;
            tracing::info!("Running database migrations...");
            db.run_migrations().await?;
            Ok(Arc::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory score store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_ledger(config: &Config) -> anyhow::Result<Arc<dyn LedgerMirror>> {
    match EvmLedger::from_config(config)? {
        Some(ledger) => {
            tracing::info!(
                "Ledger mirror enabled (writable: {})",
                ledger.is_writable()
            );
            Ok(Arc::new(ledger))
        }
        None => {
            tracing::info!("Ledger mirror disabled");
            Ok(Arc::new(DisabledLedger))
        }
    }
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Personal bests
        .route(
            "/api/scores",
            get(api::scores::list_scores).post(api::scores::submit_score),
        )
        .route("/api/scores/{identity}", get(api::scores::get_personal_best))
        // Ledger mirror
        .route(
            "/api/ledger/scores",
            get(api::ledger::list_ledger_scores).post(api::ledger::submit_ledger_score),
        )
        .route(
            "/api/ledger/scores/{identity}",
            get(api::ledger::get_ledger_best),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn router() -> Router {
        build_router(api::test_state(
            Arc::new(MemoryStore::new()),
            Arc::new(DisabledLedger),
        ))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn malformed_limit_is_json_validation_error() {
        let (status, body) = get_json(router(), "/api/scores?limit=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn zero_limit_returns_empty_leaderboard() {
        let (status, body) = get_json(router(), "/api/scores?limit=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["topScores"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn health_route_is_mounted() {
        let (status, body) = get_json(router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ledger"], "disabled");
    }
}
