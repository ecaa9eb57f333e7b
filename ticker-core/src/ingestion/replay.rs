// ingestion/replay.rs
//
// Historical replay: feeds stored rows back through the same sink the live
// scheduler uses, so subscribers cannot tell the difference in shape.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::info;

use super::QuoteSink;
use crate::storage::{Storage, StoredQuote};
use ticker_common::error::StorageError;
use ticker_common::types::Quote;

const REPLAY_ROW_LIMIT: i64 = 1000;

pub struct ReplayEngine {
    storage: Arc<Storage>,
}

impl ReplayEngine {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Replay up to the most recent 1000 stored quotes for `symbol` in
    /// chronological order, pacing emissions at `speed` quotes per second.
    /// Returns how many quotes were emitted.
    pub async fn replay(
        &self,
        symbol: &str,
        speed: f64,
        sink: Arc<dyn QuoteSink>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<usize, StorageError> {
        let mut rows = self.storage.recent_quotes(symbol, REPLAY_ROW_LIMIT).await?;
        rows.reverse();

        let speed = if speed > 0.0 { speed } else { 1.0 };
        let pause = std::time::Duration::from_secs_f64(1.0 / speed);

        info!("replaying {} stored quotes for {}", rows.len(), symbol);

        let mut emitted = 0;
        for row in &rows {
            sink.publish(quote_from_row(symbol, row)).await;
            emitted += 1;

            tokio::select! {
                _ = sleep(pause) => {}
                _ = shutdown_rx.recv() => break,
            }
        }

        Ok(emitted)
    }
}

/// Rebuild a distributable quote from a stored row. Only the fields we
/// persisted are populated; the price is the stored numeric rendered as a
/// decimal string and the trading day comes from the row timestamp.
fn quote_from_row(symbol: &str, row: &StoredQuote) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        open: String::new(),
        high: String::new(),
        low: String::new(),
        price: row.price.to_string(),
        volume: row.volume.to_string(),
        latest_trading_day: row.timestamp.format("%Y-%m-%d").to_string(),
        previous_close: String::new(),
        change: String::new(),
        change_percent: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_quote_from_row() {
        let row = StoredQuote {
            price: Decimal::new(1902500, 4),
            volume: 51_234_567,
            timestamp: NaiveDate::from_ymd_opt(2024, 6, 14)
                .unwrap()
                .and_hms_opt(15, 30, 0)
                .unwrap(),
        };

        let quote = quote_from_row("AAPL", &row);
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, "190.2500");
        assert_eq!(quote.volume, "51234567");
        assert_eq!(quote.latest_trading_day, "2024-06-14");

        // The reconstructed record parses like a live one.
        assert_eq!(quote.price_f64(), 190.25);
        assert_eq!(quote.volume_i64(), 51_234_567);
    }

    #[test]
    fn test_quote_from_row_whole_price() {
        let row = StoredQuote {
            price: Decimal::from(42),
            volume: 10,
            timestamp: NaiveDate::from_ymd_opt(2023, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };

        let quote = quote_from_row("TSLA", &row);
        assert_eq!(quote.price, "42");
        assert_eq!(quote.latest_trading_day, "2023-01-02");
    }
}
