/// Application constants

pub const API_VERSION: &str = "v1";

// Leaderboard
pub const LEADERBOARD_DEFAULT_LIMIT: i64 = 10;
pub const LEADERBOARD_MAX_LIMIT: i64 = 100;

// Store retry
pub const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_STORE_RETRY_BASE_DELAY_MS: u64 = 100;
pub const STORE_RETRY_MAX_DELAY_MS: u64 = 2_000;
pub const STORE_RETRY_JITTER_MS: u64 = 25;

// Compare-and-set rounds before a submission gives up under contention
pub const MAX_RECONCILE_ROUNDS: u32 = 8;

// Ledger
pub const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 30;

// Scores are stored in a BIGINT column
pub const MAX_SCORE: u64 = i64::MAX as u64;
