// provider/mod.rs
//
// Upstream quote provider: the Alpha Vantage client plus the capability
// trait the rest of the service programs against.

mod cache;
mod client;
mod error;
mod types;

pub use client::AlphaVantageClient;
pub use error::ProviderError;

use async_trait::async_trait;
use std::collections::BTreeMap;

use ticker_common::types::{DailyBar, Quote};

/// A source of live quotes and daily history.
///
/// The ingestion scheduler and the REST handlers only see this trait so
/// tests can script upstream behavior.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch the current quote for a symbol.
    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError>;

    /// Fetch the daily OHLCV history for a symbol, keyed by date string.
    async fn daily_history(&self, symbol: &str) -> Result<BTreeMap<String, DailyBar>, ProviderError>;
}
