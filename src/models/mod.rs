// src/models/mod.rs
pub mod score;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use score::{
    LeaderboardResponse,
    LedgerEntry,
    LedgerOutcome,
    LedgerPlayerBestResponse,
    LedgerScoresResponse,
    LedgerWriteResponse,
    PersonalBestResponse,
    ScoreRecord,
    ScoreSubmission,
    SubmitScoreRequest,
    SubmitScoreResponse,
};
