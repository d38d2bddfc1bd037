use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::ScoreStore;
use crate::{error::Result, models::ScoreRecord};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    // insertion order; the index maps identity -> position
    records: Vec<ScoreRecord>,
    index: HashMap<String, usize>,
}

/// In-process store for development and tests. Lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn find(&self, identity: &str) -> Result<Option<ScoreRecord>> {
        let state = self.state.read().await;
        Ok(state
            .index
            .get(identity)
            .map(|&position| state.records[position].clone()))
    }

    async fn insert_if_absent(&self, record: &ScoreRecord) -> Result<Option<ScoreRecord>> {
        let mut state = self.state.write().await;
        if state.index.contains_key(&record.identity) {
            return Ok(None);
        }

        state.next_id += 1;
        let mut stored = record.clone();
        stored.id = Some(state.next_id);

        let position = state.records.len();
        state.index.insert(stored.identity.clone(), position);
        state.records.push(stored.clone());
        Ok(Some(stored))
    }

    async fn compare_and_set_best(
        &self,
        identity: &str,
        expected: i64,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreRecord>> {
        let mut state = self.state.write().await;
        let Some(&position) = state.index.get(identity) else {
            return Ok(None);
        };

        let current = &mut state.records[position];
        if current.best_score != expected {
            return Ok(None);
        }
        *current = current.improved(score, now);
        Ok(Some(current.clone()))
    }

    async fn top(&self, limit: i64) -> Result<Vec<ScoreRecord>> {
        let state = self.state.read().await;
        let mut records = state.records.clone();
        // stable: equal bests keep insertion order
        records.sort_by(|a, b| b.best_score.cmp(&a.best_score));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
