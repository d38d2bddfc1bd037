use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_LEDGER_TIMEOUT_SECS, DEFAULT_STORE_RETRY_ATTEMPTS, DEFAULT_STORE_RETRY_BASE_DELAY_MS,
};

/// Which personal-best store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("Unknown SCORE_STORE '{}'", other),
        }
    }
}

/// What a request boundary does when the store cannot be reached.
///
/// `Degrade` answers with an unpersisted record flagged `isFallback`,
/// `Propagate` answers with a 503.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFailurePolicy {
    Degrade,
    Propagate,
}

impl FromStr for StoreFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(StoreFailurePolicy::Degrade),
            "propagate" => Ok(StoreFailurePolicy::Propagate),
            other => anyhow::bail!("Unknown STORE_FAILURE_POLICY '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Store
    pub score_store: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub store_failure_policy: StoreFailurePolicy,
    pub store_retry_attempts: u32,
    pub store_retry_base_delay_ms: u64,

    // Ledger
    pub ethereum_rpc_url: Option<String>,
    pub snake_game_contract_address: Option<String>,
    pub relayer_private_key: Option<String>,
    pub chain_id: u64,
    pub ledger_timeout_secs: u64,
    pub ledger_mirror_on_submit: bool,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            score_store: env::var("SCORE_STORE")
                .unwrap_or_else(|_| "postgres".to_string())
                .parse()?,
            database_url: optional_var("DATABASE_URL"),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            store_failure_policy: env::var("STORE_FAILURE_POLICY")
                .unwrap_or_else(|_| "degrade".to_string())
                .parse()?,
            store_retry_attempts: env::var("STORE_RETRY_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_STORE_RETRY_ATTEMPTS),
            store_retry_base_delay_ms: env::var("STORE_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_STORE_RETRY_BASE_DELAY_MS),

            ethereum_rpc_url: optional_var("ETHEREUM_RPC_URL"),
            snake_game_contract_address: optional_var("SNAKE_GAME_CONTRACT_ADDRESS"),
            relayer_private_key: optional_var("RELAYER_PRIVATE_KEY"),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "31337".to_string())
                .parse()?,
            ledger_timeout_secs: env::var("LEDGER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LEDGER_TIMEOUT_SECS),
            ledger_mirror_on_submit: env_flag("LEDGER_MIRROR_ON_SUBMIT"),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.score_store == StoreBackend::Postgres && self.database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when SCORE_STORE=postgres");
        }
        if self.store_retry_attempts == 0 {
            anyhow::bail!("STORE_RETRY_ATTEMPTS must be at least 1");
        }
        if let Some(rpc) = &self.ethereum_rpc_url {
            url::Url::parse(rpc)
                .map_err(|e| anyhow::anyhow!("ETHEREUM_RPC_URL is invalid: {}", e))?;
        }

        if self.score_store == StoreBackend::Memory && !self.is_development() {
            tracing::warn!("In-memory score store outside development; scores are lost on restart");
        }
        if self.store_retry_attempts > 10 {
            tracing::warn!(
                "STORE_RETRY_ATTEMPTS={} is high; submissions may stall during outages",
                self.store_retry_attempts
            );
        }
        if self.ethereum_rpc_url.is_some() != self.snake_game_contract_address.is_some() {
            tracing::warn!(
                "Ledger mirror needs both ETHEREUM_RPC_URL and SNAKE_GAME_CONTRACT_ADDRESS; ledger disabled"
            );
        }
        if self.ledger_enabled() && self.relayer_private_key.is_none() {
            tracing::warn!("RELAYER_PRIVATE_KEY missing; ledger is read-only");
        }
        if self.ledger_mirror_on_submit && !self.ledger_enabled() {
            tracing::warn!("LEDGER_MIRROR_ON_SUBMIT is set but the ledger is disabled");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn ledger_enabled(&self) -> bool {
        self.ethereum_rpc_url.is_some() && self.snake_game_contract_address.is_some()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| {
            let normalized = v.trim().to_ascii_lowercase();
            normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
        })
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        environment: "test".to_string(),
        score_store: StoreBackend::Memory,
        database_url: None,
        database_max_connections: 1,
        store_failure_policy: StoreFailurePolicy::Degrade,
        store_retry_attempts: 3,
        store_retry_base_delay_ms: 1,
        ethereum_rpc_url: None,
        snake_game_contract_address: None,
        relayer_private_key: None,
        chain_id: 31337,
        ledger_timeout_secs: 5,
        ledger_mirror_on_submit: false,
        cors_allowed_origins: "*".to_string(),
    }
}
