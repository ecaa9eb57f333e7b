//! Postgres persistence for raw quotes and detected anomalies.
//!
//! The schema is created on connect. Persistence is an optional
//! collaborator: if the pool cannot be built at startup the service runs in
//! no-persistence mode, and individual write failures are logged by the
//! caller rather than retried.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool, Row};
use tracing::info;

use ticker_common::error::StorageError;
use ticker_common::types::Anomaly;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS market_data (
    id SERIAL PRIMARY KEY,
    symbol VARCHAR(10) NOT NULL,
    price DECIMAL(18, 4) NOT NULL,
    volume BIGINT NOT NULL,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_symbol_timestamp ON market_data (symbol, timestamp DESC);

CREATE TABLE IF NOT EXISTS anomalies (
    id SERIAL PRIMARY KEY,
    symbol VARCHAR(10) NOT NULL,
    type VARCHAR(50) NOT NULL,
    confidence DECIMAL(5, 4) NOT NULL,
    description TEXT,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// One stored quote row, as read back for replay.
#[derive(Debug, Clone)]
pub struct StoredQuote {
    pub price: Decimal,
    pub volume: i64,
    pub timestamp: NaiveDateTime,
}

pub struct Storage {
    pool: PgPool,
}

impl Storage {
    /// Build the pool, verify connectivity and create the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        pool.execute(SCHEMA).await?;
        info!("database schema ready");

        Ok(Self { pool })
    }

    pub async fn save_quote(
        &self,
        symbol: &str,
        price: f64,
        volume: i64,
    ) -> Result<(), StorageError> {
        let price = Decimal::try_from(price).unwrap_or(Decimal::ZERO);

        sqlx::query("INSERT INTO market_data (symbol, price, volume) VALUES ($1, $2, $3)")
            .bind(symbol)
            .bind(price)
            .bind(volume)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn save_anomaly(&self, anomaly: &Anomaly) -> Result<(), StorageError> {
        let confidence = Decimal::try_from(anomaly.confidence).unwrap_or(Decimal::ZERO);

        sqlx::query(
            "INSERT INTO anomalies (symbol, type, confidence, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(&anomaly.symbol)
        .bind(anomaly.kind.as_str())
        .bind(confidence)
        .bind(&anomaly.details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The most recent stored quotes for a symbol, newest first.
    pub async fn recent_quotes(
        &self,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<StoredQuote>, StorageError> {
        let rows = sqlx::query(
            "SELECT price, volume, timestamp FROM market_data \
             WHERE symbol = $1 ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut quotes = Vec::with_capacity(rows.len());
        for row in rows {
            quotes.push(StoredQuote {
                price: row.try_get("price")?,
                volume: row.try_get("volume")?,
                timestamp: row.try_get("timestamp")?,
            });
        }
        Ok(quotes)
    }
}
