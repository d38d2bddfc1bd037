use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ==================== SCORE RECORD ====================
/// Personal best of one identity. At most one exists per identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    /// Insertion order. `None` on records that were never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[sqlx(rename = "address")]
    pub identity: String,
    #[sqlx(rename = "score")]
    pub best_score: i64,
    #[sqlx(rename = "timestamp")]
    pub last_updated: DateTime<Utc>,
    pub is_personal_best: bool,
}

impl ScoreRecord {
    /// Record for an identity's first accepted submission.
    pub fn first(identity: &str, score: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            identity: identity.to_string(),
            best_score: score,
            last_updated: now,
            is_personal_best: true,
        }
    }

    /// Copy of this record with a strictly higher best.
    pub fn improved(&self, score: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            identity: self.identity.clone(),
            best_score: score,
            last_updated: now,
            is_personal_best: true,
        }
    }
}

// ==================== SUBMISSION ====================
/// Raw body of a score submission, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    #[serde(alias = "address")]
    pub identity: Option<String>,
    pub score: Option<serde_json::Value>,
    pub mirror_to_ledger: Option<bool>,
}

/// A submission that passed intake validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSubmission {
    pub identity: String,
    pub score: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreResponse {
    pub success: bool,
    pub record: ScoreRecord,
    pub is_new_high_score: bool,
    /// True when the store could not be reached and `record` was never persisted.
    pub is_fallback: bool,
    pub persisted: bool,
    pub ledger: LedgerOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub top_scores: Vec<ScoreRecord>,
    pub success: bool,
    pub is_fallback: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalBestResponse {
    pub success: bool,
    pub record: ScoreRecord,
}

// ==================== LEDGER ====================
/// One row of the contract's high score table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub player: String,
    pub score: u64,
    /// Block timestamp, seconds since epoch.
    pub timestamp: u64,
}

/// Result of one ledger write, reported next to the store result and never merged with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LedgerOutcome {
    Confirmed {
        #[serde(rename = "transactionHash")]
        transaction_hash: String,
        #[serde(rename = "blockNumber", skip_serializing_if = "Option::is_none")]
        block_number: Option<u64>,
    },
    /// Sent, but not seen mined before the ledger timeout.
    Pending {
        #[serde(rename = "transactionHash")]
        transaction_hash: String,
    },
    Failed {
        error: String,
    },
    /// No ledger is configured, or it is read-only.
    Disabled,
    /// The caller did not ask for a ledger write.
    Skipped,
}

impl LedgerOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, LedgerOutcome::Confirmed { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct LedgerScoresResponse {
    pub success: bool,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPlayerBestResponse {
    pub success: bool,
    pub identity: String,
    pub best_score: u64,
}

#[derive(Debug, Serialize)]
pub struct LedgerWriteResponse {
    pub success: bool,
    pub ledger: LedgerOutcome,
}
