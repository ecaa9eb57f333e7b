// provider/client.rs

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::cache::{CacheOp, CachedValue, RequestCache};
use super::error::ProviderError;
use super::types::{GlobalQuoteResponse, TimeSeriesDailyResponse};
use super::QuoteProvider;
use ticker_common::types::{DailyBar, Quote};

/// Alpha Vantage HTTP client with short-TTL request memoization.
///
/// The upstream signals both "throttled" and "unknown symbol" by returning a
/// 200 whose quote envelope has an empty symbol; both map to
/// [`ProviderError::RateLimited`]. Network I/O happens without any cache
/// guard held.
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    cache: RequestCache,
}

impl AlphaVantageClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        cache_ttl: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            cache: RequestCache::new(cache_ttl),
        })
    }

    async fn fetch(&self, function: &str, symbol: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        Ok(response.bytes().await?.to_vec())
    }

    fn decode_quote(body: &[u8]) -> Result<Quote, ProviderError> {
        let parsed: GlobalQuoteResponse =
            serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        if parsed.global_quote.symbol.is_empty() {
            return Err(ProviderError::RateLimited);
        }

        Ok(parsed.global_quote.into())
    }

    fn decode_history(body: &[u8]) -> Result<BTreeMap<String, DailyBar>, ProviderError> {
        let parsed: TimeSeriesDailyResponse =
            serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        let series = parsed.time_series.ok_or(ProviderError::RateLimited)?;

        Ok(series
            .into_iter()
            .map(|(date, bar)| (date, bar.into()))
            .collect())
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        if let Some(CachedValue::Quote(quote)) = self.cache.get(CacheOp::Quote, symbol) {
            debug!("serving cached quote for {}", symbol);
            return Ok(quote);
        }

        let body = self.fetch("GLOBAL_QUOTE", symbol).await?;
        let quote = Self::decode_quote(&body)?;

        self.cache
            .insert(CacheOp::Quote, symbol, CachedValue::Quote(quote.clone()));

        Ok(quote)
    }

    async fn daily_history(
        &self,
        symbol: &str,
    ) -> Result<BTreeMap<String, DailyBar>, ProviderError> {
        if let Some(CachedValue::History(history)) = self.cache.get(CacheOp::History, symbol) {
            debug!("serving cached history for {}", symbol);
            return Ok(history);
        }

        let body = self.fetch("TIME_SERIES_DAILY", symbol).await?;
        let history = Self::decode_history(&body)?;

        self.cache.insert(
            CacheOp::History,
            symbol,
            CachedValue::History(history.clone()),
        );

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_quote() {
        let body = br#"{
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "189.0000",
                "03. high": "191.0500",
                "04. low": "188.5000",
                "05. price": "190.2500",
                "06. volume": "51234567",
                "07. latest trading day": "2024-06-14",
                "08. previous close": "189.9000",
                "09. change": "0.3500",
                "10. change percent": "0.1843%"
            }
        }"#;

        let quote = AlphaVantageClient::decode_quote(body).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, "190.2500");
        assert_eq!(quote.change_percent, "0.1843%");
    }

    #[test]
    fn test_decode_quote_empty_envelope_is_rate_limited() {
        // This is the body Alpha Vantage sends with a 200 when throttled.
        let body = br#"{
            "Information": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."
        }"#;

        let err = AlphaVantageClient::decode_quote(body).unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited));
    }

    #[test]
    fn test_decode_quote_malformed_body() {
        let err = AlphaVantageClient::decode_quote(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn test_decode_history() {
        let body = br#"{
            "Time Series (Daily)": {
                "2024-06-14": {
                    "1. open": "189.0000",
                    "2. high": "191.0500",
                    "3. low": "188.5000",
                    "4. close": "190.2500",
                    "5. volume": "51234567"
                },
                "2024-06-13": {
                    "1. open": "187.0000",
                    "2. high": "189.5000",
                    "3. low": "186.0000",
                    "4. close": "189.9000",
                    "5. volume": "48000000"
                }
            }
        }"#;

        let history = AlphaVantageClient::decode_history(body).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history["2024-06-14"].close, "190.2500");
        assert_eq!(history["2024-06-13"].volume, "48000000");
    }

    #[test]
    fn test_decode_history_missing_series_is_rate_limited() {
        let body = br#"{"Note": "rate limited"}"#;
        let err = AlphaVantageClient::decode_history(body).unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited));
    }
}
