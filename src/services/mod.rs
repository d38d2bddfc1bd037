// All service modules
pub mod intake;
pub mod leaderboard;
pub mod ledger;
pub mod reconciler;
pub mod retry;

// Re-export for convenience
pub use leaderboard::Leaderboard;
pub use ledger::{DisabledLedger, EvmLedger, LedgerMirror};
pub use reconciler::Reconciler;
pub use retry::RetryPolicy;
