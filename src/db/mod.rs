//! SQLite trade journal.
//!
//! One row per rebalance attempt, written after the cycle finishes. Decimal
//! values are stored as text so sizes and prices round-trip exactly.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::models::TradeRecord;
use crate::notify::TradeSink;

/// Journal backed by a SQLite connection pool.
pub struct Journal {
    pool: SqlitePool,
}

/// Journal row as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub equity: String,
    pub price: String,
    pub position: String,
    pub target: Option<String>,
    pub delta: Option<String>,
    pub action: Option<String>,
    pub outcome: String,
    pub order_id: Option<String>,
    pub order_size: Option<String>,
    pub success: bool,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

/// Outcome counts over the whole journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalStats {
    pub total: i64,
    pub executed: i64,
    pub simulated: i64,
    pub held: i64,
    pub failed: i64,
}

impl Journal {
    /// Open the journal and create the schema if needed.
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::open(database_url, 5).await
    }

    /// Open with an explicit pool size. In-memory databases need exactly one
    /// connection, since each connection gets its own database.
    pub async fn open(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let journal = Self { pool };
        journal.run_migrations().await?;

        Ok(journal)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trade_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                instrument TEXT NOT NULL,
                equity TEXT NOT NULL,
                price TEXT NOT NULL,
                position TEXT NOT NULL,
                target TEXT,
                delta TEXT,
                action TEXT,
                outcome TEXT NOT NULL,
                order_id TEXT,
                order_size TEXT,
                success INTEGER NOT NULL,
                error_kind TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_trade_records_timestamp ON trade_records(timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append one record. Returns the row id.
    pub async fn save(&self, record: &TradeRecord) -> Result<i64> {
        let decision = record.decision.as_ref();

        let result = sqlx::query(
            r#"
            INSERT INTO trade_records (
                timestamp, instrument, equity, price, position,
                target, delta, action, outcome, order_id, order_size,
                success, error_kind, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.timestamp)
        .bind(&record.instrument)
        .bind(record.snapshot.equity.to_string())
        .bind(record.snapshot.price.to_string())
        .bind(record.snapshot.position.to_string())
        .bind(decision.map(|d| d.target.to_string()))
        .bind(decision.map(|d| d.delta.to_string()))
        .bind(decision.map(|d| d.action.as_str()))
        .bind(record.outcome.as_str())
        .bind(record.order_id())
        .bind(record.order_size().map(|s| s.to_string()))
        .bind(record.success())
        .bind(record.error_kind().map(|k| k.as_str()))
        .bind(record.error())
        .execute(&self.pool)
        .await
        .context("Failed to save trade record")?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent records, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<StoredRecord>> {
        sqlx::query_as::<_, StoredRecord>(
            r#"
            SELECT id, timestamp, instrument, equity, price, position,
                   target, delta, action, outcome, order_id, order_size,
                   success, error_kind, error_message
            FROM trade_records
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch trade records")
    }

    pub async fn stats(&self) -> Result<JournalStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT outcome, COUNT(*) FROM trade_records GROUP BY outcome")
                .fetch_all(&self.pool)
                .await
                .context("Failed to count trade records")?;

        let mut stats = JournalStats::default();
        for (outcome, count) in rows {
            stats.total += count;
            match outcome.as_str() {
                "executed" => stats.executed += count,
                "simulated" => stats.simulated += count,
                "held" => stats.held += count,
                "failed" => stats.failed += count,
                _ => {}
            }
        }

        Ok(stats)
    }
}

#[async_trait]
impl TradeSink for Journal {
    fn name(&self) -> &str {
        "journal"
    }

    async fn record(&self, record: &TradeRecord) -> Result<()> {
        self.save(record).await.map(|_| ())
    }
}

impl StoredRecord {
    /// One-line summary for the history listing.
    pub fn summary(&self) -> String {
        if !self.success {
            return format!(
                "{}: {}",
                self.error_kind.as_deref().unwrap_or("error"),
                self.error_message.as_deref().unwrap_or("")
            );
        }

        match self.outcome.as_str() {
            "held" => format!("hold, delta {}", self.delta.as_deref().unwrap_or("-")),
            _ => format!(
                "{} {} (order {})",
                self.action.as_deref().unwrap_or("-"),
                self.order_size.as_deref().unwrap_or("-"),
                self.order_id.as_deref().unwrap_or("dry run"),
            ),
        }
    }
}
