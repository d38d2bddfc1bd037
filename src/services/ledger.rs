use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, TransactionReceipt, H256, U256, U64},
    utils::to_checksum,
};
use tokio::time::timeout;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::{LedgerEntry, LedgerOutcome, ScoreSubmission},
};

ethers::contract::abigen!(SnakeGameContract, "./abi/SnakeGame.json");

type ReadClient = Provider<Http>;
type WriteClient = SignerMiddleware<Provider<Http>, LocalWallet>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerReceipt {
    Mined {
        transaction_hash: String,
        block_number: Option<u64>,
    },
    /// Broadcast, but no receipt arrived in time. It may still be mined.
    Pending { transaction_hash: String },
}

/// The external score contract. Writes here are never coordinated with the
/// score store; the two may disagree until a later write catches one up.
#[async_trait]
pub trait LedgerMirror: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn is_writable(&self) -> bool;

    async fn submit_score(&self, score: u64) -> Result<LedgerReceipt>;

    async fn high_scores(&self) -> Result<Vec<LedgerEntry>>;

    async fn player_best(&self, identity: &str) -> Result<u64>;
}

/// Writes one submission to the ledger and reports the outcome. Never fails:
/// a ledger error becomes `LedgerOutcome::Failed` so the store path is unaffected.
pub async fn mirror_score(ledger: &dyn LedgerMirror, submission: &ScoreSubmission) -> LedgerOutcome {
    if !ledger.is_writable() {
        return LedgerOutcome::Disabled;
    }

    match ledger.submit_score(submission.score as u64).await {
        Ok(LedgerReceipt::Mined {
            transaction_hash,
            block_number,
        }) => {
            tracing::info!(
                "Ledger accepted score {} for {} in tx {}",
                submission.score,
                submission.identity,
                transaction_hash
            );
            LedgerOutcome::Confirmed {
                transaction_hash,
                block_number,
            }
        }
        Ok(LedgerReceipt::Pending { transaction_hash }) => {
            tracing::warn!(
                "Ledger write for {} sent as {} but not yet mined",
                submission.identity,
                transaction_hash
            );
            LedgerOutcome::Pending { transaction_hash }
        }
        Err(err) => {
            tracing::warn!(
                "Ledger write for {} failed: {}",
                submission.identity,
                err
            );
            LedgerOutcome::Failed {
                error: err.to_string(),
            }
        }
    }
}

/// Ledger used when no contract is configured.
pub struct DisabledLedger;

#[async_trait]
impl LedgerMirror for DisabledLedger {
    fn is_enabled(&self) -> bool {
        false
    }

    fn is_writable(&self) -> bool {
        false
    }

    async fn submit_score(&self, _score: u64) -> Result<LedgerReceipt> {
        Err(AppError::LedgerWriteFailure(
            "ledger mirror is not configured".to_string(),
        ))
    }

    async fn high_scores(&self) -> Result<Vec<LedgerEntry>> {
        Err(AppError::LedgerUnavailable(
            "ledger mirror is not configured".to_string(),
        ))
    }

    async fn player_best(&self, _identity: &str) -> Result<u64> {
        Err(AppError::LedgerUnavailable(
            "ledger mirror is not configured".to_string(),
        ))
    }
}

/// SnakeGame contract over EVM JSON-RPC. Writes are signed by the relayer key.
pub struct EvmLedger {
    reader: SnakeGameContract<ReadClient>,
    writer: Option<SnakeGameContract<WriteClient>>,
    timeout: Duration,
}

impl EvmLedger {
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let (Some(rpc_url), Some(contract)) = (
            config.ethereum_rpc_url.as_deref(),
            config.snake_game_contract_address.as_deref(),
        ) else {
            return Ok(None);
        };

        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| AppError::Internal(format!("Invalid RPC URL: {}", e)))?;
        let address = parse_address(contract)?;

        let reader = SnakeGameContract::new(address, Arc::new(provider.clone()));
        let writer = match config.relayer_private_key.as_deref() {
            Some(key) => {
                let wallet = parse_wallet(key)?.with_chain_id(config.chain_id);
                tracing::info!("Ledger relayer: {}", to_checksum(&wallet.address(), None));
                let client = SignerMiddleware::new(provider, wallet);
                Some(SnakeGameContract::new(address, Arc::new(client)))
            }
            None => None,
        };

        Ok(Some(Self {
            reader,
            writer,
            timeout: Duration::from_secs(config.ledger_timeout_secs),
        }))
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, String>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::LedgerUnavailable(format!("{}: {}", what, e))),
            Err(_) => Err(AppError::LedgerUnavailable(format!(
                "{}: timed out after {}s",
                what,
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl LedgerMirror for EvmLedger {
    fn is_enabled(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    async fn submit_score(&self, score: u64) -> Result<LedgerReceipt> {
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| AppError::LedgerWriteFailure("ledger is read-only".to_string()))?;

        let call = writer.submit_score(U256::from(score));
        let pending = self
            .bounded("submitScore", async {
                call.send().await.map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| match e {
                AppError::LedgerUnavailable(msg) => AppError::LedgerWriteFailure(msg),
                other => other,
            })?;

        // Broadcast: a missing receipt from here on is pending, not failed.
        let transaction_hash = format_tx_hash(pending.tx_hash());
        let waited = match timeout(self.timeout, pending).await {
            Ok(result) => Some(result.map_err(|e| e.to_string())),
            Err(_) => {
                tracing::warn!(
                    "No receipt for {} after {}s",
                    transaction_hash,
                    self.timeout.as_secs()
                );
                None
            }
        };
        settle_receipt(transaction_hash, waited)
    }

    async fn high_scores(&self) -> Result<Vec<LedgerEntry>> {
        let call = self.reader.get_high_scores();
        let scores = self
            .bounded("getHighScores", async {
                call.call().await.map_err(|e| e.to_string())
            })
            .await?;

        Ok(scores
            .into_iter()
            .map(|entry| LedgerEntry {
                player: to_checksum(&entry.player, None),
                score: u256_to_u64(entry.score),
                timestamp: u256_to_u64(entry.timestamp),
            })
            .collect())
    }

    async fn player_best(&self, identity: &str) -> Result<u64> {
        let player = parse_address(identity)
            .map_err(|_| AppError::Validation(format!("{} is not an EVM address", identity)))?;
        let call = self.reader.get_player_best_score(player);
        let best = self
            .bounded("getPlayerBestScore", async {
                call.call().await.map_err(|e| e.to_string())
            })
            .await?;
        Ok(u256_to_u64(best))
    }
}

/// Classifies what came back while waiting on a broadcast transaction.
/// `None` means the wait timed out.
fn settle_receipt(
    transaction_hash: String,
    waited: Option<std::result::Result<Option<TransactionReceipt>, String>>,
) -> Result<LedgerReceipt> {
    match waited {
        Some(Ok(Some(receipt))) if receipt.status == Some(U64::zero()) => Err(
            AppError::LedgerWriteFailure(format!("transaction {} reverted", transaction_hash)),
        ),
        Some(Ok(Some(receipt))) => Ok(LedgerReceipt::Mined {
            transaction_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
        }),
        Some(Ok(None)) => Err(AppError::LedgerWriteFailure(format!(
            "transaction {} dropped before inclusion",
            transaction_hash
        ))),
        Some(Err(e)) => {
            tracing::warn!("Receipt lookup for {} failed: {}", transaction_hash, e);
            Ok(LedgerReceipt::Pending { transaction_hash })
        }
        None => Ok(LedgerReceipt::Pending { transaction_hash }),
    }
}

fn format_tx_hash(hash: H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

pub fn parse_address(value: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| AppError::Internal(format!("Invalid address {}: {}", value, e)))
}

fn parse_wallet(key: &str) -> Result<LocalWallet> {
    let trimmed = key.trim();
    let hex_key = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex_key
        .parse::<LocalWallet>()
        .map_err(|e| AppError::Internal(format!("Invalid RELAYER_PRIVATE_KEY: {}", e)))
}

/// Saturates instead of failing; scores beyond u64 do not occur in practice.
pub fn u256_to_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}
