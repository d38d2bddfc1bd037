use std::sync::Arc;

use crate::{
    constants::LEADERBOARD_MAX_LIMIT,
    db::ScoreStore,
    error::{AppError, Result},
    models::ScoreRecord,
};

use super::retry::{with_retry, RetryPolicy};

/// Read-only views over the personal-best store.
pub struct Leaderboard {
    store: Arc<dyn ScoreStore>,
    retry: RetryPolicy,
}

impl Leaderboard {
    pub fn new(store: Arc<dyn ScoreStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// At most `n` personal bests, highest first, ties in insertion order.
    /// `n <= 0` yields an empty list.
    pub async fn top_n(&self, n: i64) -> Result<Vec<ScoreRecord>> {
        let limit = clamp_limit(n);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let records =
            with_retry(&self.retry, "leaderboard read", || self.store.top(limit)).await?;
        tracing::debug!("Leaderboard read {} of at most {} records", records.len(), limit);
        Ok(records)
    }

    pub async fn personal_best(&self, identity: &str) -> Result<ScoreRecord> {
        with_retry(&self.retry, "personal best read", || self.store.find(identity))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No score recorded for {}", identity)))
    }
}

pub fn clamp_limit(n: i64) -> i64 {
    n.clamp(0, LEADERBOARD_MAX_LIMIT)
}
