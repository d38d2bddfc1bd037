use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::Config, error::Result, models::ScoreRecord};

pub mod memory;
#[cfg(test)]
pub mod testing;

pub use memory::MemoryStore;

/// Personal-best storage keyed by identity.
///
/// Both mutations are conditional so that a read-then-write per identity
/// can be made safe without locks spanning calls: a writer that lost a race
/// gets `None` back and must re-read.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn find(&self, identity: &str) -> Result<Option<ScoreRecord>>;

    /// Inserts `record` unless the identity already has one.
    async fn insert_if_absent(&self, record: &ScoreRecord) -> Result<Option<ScoreRecord>>;

    /// Sets the best to `score` only while the stored best still equals `expected`.
    async fn compare_and_set_best(
        &self,
        identity: &str,
        expected: i64,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreRecord>>;

    /// Highest bests first, ties in insertion order.
    async fn top(&self, limit: i64) -> Result<Vec<ScoreRecord>>;

    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

const RECORD_COLUMNS: &str = "id, address, score, timestamp, is_personal_best";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// ==================== SCORE QUERIES ====================
#[async_trait]
impl ScoreStore for Database {
    async fn find(&self, identity: &str) -> Result<Option<ScoreRecord>> {
        let record = sqlx::query_as::<_, ScoreRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM scores WHERE address = $1"
        ))
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn insert_if_absent(&self, record: &ScoreRecord) -> Result<Option<ScoreRecord>> {
        let inserted = sqlx::query_as::<_, ScoreRecord>(&format!(
            "INSERT INTO scores (address, score, timestamp, is_personal_best)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (address) DO NOTHING
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(&record.identity)
        .bind(record.best_score)
        .bind(record.last_updated)
        .bind(record.is_personal_best)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn compare_and_set_best(
        &self,
        identity: &str,
        expected: i64,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ScoreRecord>> {
        let updated = sqlx::query_as::<_, ScoreRecord>(&format!(
            "UPDATE scores
             SET score = $3, timestamp = $4, is_personal_best = TRUE
             WHERE address = $1 AND score = $2
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(identity)
        .bind(expected)
        .bind(score)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn top(&self, limit: i64) -> Result<Vec<ScoreRecord>> {
        let records = sqlx::query_as::<_, ScoreRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM scores
             ORDER BY score DESC, id ASC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
