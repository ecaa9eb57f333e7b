// provider/types.rs
//
// Wire structures matching the Alpha Vantage response envelopes. The numbered
// field names are part of the upstream contract.

use serde::Deserialize;
use std::collections::BTreeMap;

use ticker_common::types::{DailyBar, Quote};

#[derive(Debug, Deserialize)]
pub(crate) struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    pub global_quote: RawQuote,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawQuote {
    #[serde(rename = "01. symbol", default)]
    pub symbol: String,
    #[serde(rename = "02. open", default)]
    pub open: String,
    #[serde(rename = "03. high", default)]
    pub high: String,
    #[serde(rename = "04. low", default)]
    pub low: String,
    #[serde(rename = "05. price", default)]
    pub price: String,
    #[serde(rename = "06. volume", default)]
    pub volume: String,
    #[serde(rename = "07. latest trading day", default)]
    pub latest_trading_day: String,
    #[serde(rename = "08. previous close", default)]
    pub previous_close: String,
    #[serde(rename = "09. change", default)]
    pub change: String,
    #[serde(rename = "10. change percent", default)]
    pub change_percent: String,
}

impl From<RawQuote> for Quote {
    fn from(raw: RawQuote) -> Self {
        Quote {
            symbol: raw.symbol,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            price: raw.price,
            volume: raw.volume,
            latest_trading_day: raw.latest_trading_day,
            previous_close: raw.previous_close,
            change: raw.change,
            change_percent: raw.change_percent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimeSeriesDailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    pub time_series: Option<BTreeMap<String, RawDailyBar>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDailyBar {
    #[serde(rename = "1. open", default)]
    pub open: String,
    #[serde(rename = "2. high", default)]
    pub high: String,
    #[serde(rename = "3. low", default)]
    pub low: String,
    #[serde(rename = "4. close", default)]
    pub close: String,
    #[serde(rename = "5. volume", default)]
    pub volume: String,
}

impl From<RawDailyBar> for DailyBar {
    fn from(raw: RawDailyBar) -> Self {
        DailyBar {
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
        }
    }
}
