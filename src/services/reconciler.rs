use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    constants::MAX_RECONCILE_ROUNDS,
    db::ScoreStore,
    error::{AppError, Result},
    models::{ScoreRecord, ScoreSubmission},
};

use super::retry::{with_retry, RetryPolicy};

/// What a submission does to the stored personal best.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No record yet.
    Create(ScoreRecord),
    /// Strict improvement over `expected`.
    Improve { expected: i64, next: ScoreRecord },
    /// Equal or lower: the stored record stands, timestamp included.
    Keep(ScoreRecord),
}

/// Strict-improvement policy: ties are not new high scores.
pub fn decide(
    existing: Option<&ScoreRecord>,
    submission: &ScoreSubmission,
    now: DateTime<Utc>,
) -> Decision {
    match existing {
        None => Decision::Create(ScoreRecord::first(&submission.identity, submission.score, now)),
        Some(current) if submission.score > current.best_score => Decision::Improve {
            expected: current.best_score,
            next: current.improved(submission.score, now),
        },
        Some(current) => Decision::Keep(current.clone()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub record: ScoreRecord,
    pub is_new_high_score: bool,
}

/// Unpersisted acknowledgment built from the caller's own submission.
/// Callers must flag it as a fallback wherever it is shown.
pub fn fallback_record(submission: &ScoreSubmission, now: DateTime<Utc>) -> ScoreRecord {
    ScoreRecord::first(&submission.identity, submission.score, now)
}

pub struct Reconciler {
    store: Arc<dyn ScoreStore>,
    retry: RetryPolicy,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ScoreStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Applies one submission to the store.
    ///
    /// Each round reads the current record, decides, then writes
    /// conditionally. A conditional write that loses to a concurrent
    /// submission for the same identity starts a new round.
    pub async fn reconcile(&self, submission: &ScoreSubmission) -> Result<Reconciliation> {
        let identity = submission.identity.as_str();

        for round in 1..=MAX_RECONCILE_ROUNDS {
            let existing =
                with_retry(&self.retry, "score lookup", || self.store.find(identity)).await?;

            match decide(existing.as_ref(), submission, Utc::now()) {
                Decision::Keep(record) => {
                    tracing::info!(
                        "Score {} for {} does not beat best {}; keeping existing",
                        submission.score,
                        identity,
                        record.best_score
                    );
                    return Ok(Reconciliation {
                        record,
                        is_new_high_score: false,
                    });
                }
                Decision::Create(record) => {
                    let created = with_retry(&self.retry, "score insert", || {
                        self.store.insert_if_absent(&record)
                    })
                    .await?;
                    if let Some(record) = created {
                        tracing::info!(
                            "Created score record for {} with {}",
                            identity,
                            record.best_score
                        );
                        return Ok(Reconciliation {
                            record,
                            is_new_high_score: true,
                        });
                    }
                }
                Decision::Improve { expected, next } => {
                    let updated = with_retry(&self.retry, "score update", || {
                        self.store.compare_and_set_best(
                            identity,
                            expected,
                            next.best_score,
                            next.last_updated,
                        )
                    })
                    .await?;
                    if let Some(record) = updated {
                        tracing::info!(
                            "New high score for {}: {} -> {}",
                            identity,
                            expected,
                            record.best_score
                        );
                        return Ok(Reconciliation {
                            record,
                            is_new_high_score: true,
                        });
                    }
                }
            }

            tracing::debug!(
                "Concurrent write for {} (round {}/{}); re-reading",
                identity,
                round,
                MAX_RECONCILE_ROUNDS
            );
        }

        Err(AppError::StoreUnavailable(format!(
            "gave up on {} after {} contended rounds",
            identity, MAX_RECONCILE_ROUNDS
        )))
    }
}
