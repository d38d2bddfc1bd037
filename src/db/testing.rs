//! Store doubles for tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{MemoryStore, ScoreStore};
use crate::{
    error::{AppError, Result},
    models::ScoreRecord,
};

/// Fails the first `n` calls with `StoreUnavailable`, then behaves like `MemoryStore`.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl FlakyStore {
    pub fn failing(n: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(n),
            calls: AtomicU32::new(0),
        }
    }

    pub fn down() -> Self {
        Self::failing(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::StoreUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for FlakyStore {
    async fn find(&self, identity: &str) -> Result<Option<ScoreRecord>> {
        self.gate()?;
        self.inner.find(identity).await
    }

    async fn insert_if_absent(&self, record: &ScoreRecord) -> Result<Option<ScoreRecord>> {
        self.gate()?;
        self.inner.insert_if_absent(record).await
    }

    async fn compare_and_set_best(
        &self,
        identity: &str,
        expected: i64,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreRecord>> {
        self.gate()?;
        self.inner
            .compare_and_set_best(identity, expected, score, now)
            .await
    }

    async fn top(&self, limit: i64) -> Result<Vec<ScoreRecord>> {
        self.gate()?;
        self.inner.top(limit).await
    }

    async fn ping(&self) -> Result<()> {
        self.gate()
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

/// Lets another writer land a score between the caller's read and its
/// conditional write, once.
pub struct RacingStore {
    pub inner: MemoryStore,
    interloper: Mutex<Option<(String, i64)>>,
}

impl RacingStore {
    pub fn new(identity: &str, score: i64) -> Self {
        Self {
            inner: MemoryStore::new(),
            interloper: Mutex::new(Some((identity.to_string(), score))),
        }
    }

    async fn interfere(&self) -> Result<()> {
        let pending = self.interloper.lock().unwrap().take();
        let Some((identity, score)) = pending else {
            return Ok(());
        };
        let now = Utc::now();
        match self.inner.find(&identity).await? {
            Some(current) => {
                self.inner
                    .compare_and_set_best(&identity, current.best_score, score, now)
                    .await?;
            }
            None => {
                self.inner
                    .insert_if_absent(&ScoreRecord::first(&identity, score, now))
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for RacingStore {
    async fn find(&self, identity: &str) -> Result<Option<ScoreRecord>> {
        self.inner.find(identity).await
    }

    async fn insert_if_absent(&self, record: &ScoreRecord) -> Result<Option<ScoreRecord>> {
        self.interfere().await?;
        self.inner.insert_if_absent(record).await
    }

    async fn compare_and_set_best(
        &self,
        identity: &str,
        expected: i64,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreRecord>> {
        self.interfere().await?;
        self.inner
            .compare_and_set_best(identity, expected, score, now)
            .await
    }

    async fn top(&self, limit: i64) -> Result<Vec<ScoreRecord>> {
        self.inner.top(limit).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "racing"
    }
}

/// Commits the first conditional write, then reports it as failed, as when
/// the acknowledgment is lost on the way back.
pub struct LostAckStore {
    pub inner: MemoryStore,
    armed: AtomicBool,
}

impl LostAckStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            armed: AtomicBool::new(true),
        }
    }

    fn acknowledge(&self, written: Option<ScoreRecord>) -> Result<Option<ScoreRecord>> {
        if written.is_some() && self.armed.swap(false, Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("connection reset".to_string()));
        }
        Ok(written)
    }
}

#[async_trait]
impl ScoreStore for LostAckStore {
    async fn find(&self, identity: &str) -> Result<Option<ScoreRecord>> {
        self.inner.find(identity).await
    }

    async fn insert_if_absent(&self, record: &ScoreRecord) -> Result<Option<ScoreRecord>> {
        let written = self.inner.insert_if_absent(record).await?;
        self.acknowledge(written)
    }

    async fn compare_and_set_best(
        &self,
        identity: &str,
        expected: i64,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreRecord>> {
        let written = self
            .inner
            .compare_and_set_best(identity, expected, score, now)
            .await?;
        self.acknowledge(written)
    }

    async fn top(&self, limit: i64) -> Result<Vec<ScoreRecord>> {
        self.inner.top(limit).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "lost-ack"
    }
}
