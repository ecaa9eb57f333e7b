//! Wire-visible domain types.
//!
//! The upstream provider hands back every numeric field as text; the raw
//! record is preserved verbatim for distribution while the pipeline parses
//! what it needs for the math. Frontend clients depend on the wire casing,
//! so the serde renames here are load-bearing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single quote snapshot as delivered by the upstream provider.
///
/// All fields are kept textual; `price` and `volume` are parsed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Quote {
    pub symbol: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub price: String,
    pub volume: String,
    pub latest_trading_day: String,
    pub previous_close: String,
    pub change: String,
    pub change_percent: String,
}

impl Quote {
    /// Parse the textual price; malformed input maps to 0.0 so a bad field
    /// never suppresses distribution of the raw record.
    pub fn price_f64(&self) -> f64 {
        self.price.trim().parse().unwrap_or(0.0)
    }

    /// Parse the textual volume; malformed input maps to 0.
    pub fn volume_i64(&self) -> i64 {
        self.volume.trim().parse().unwrap_or(0)
    }
}

/// One day of OHLCV history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DailyBar {
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

/// Rolling statistics for one symbol, a pure function of the window contents
/// at the moment of emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RollingMetrics {
    pub symbol: String,
    #[serde(rename = "VWAP")]
    pub vwap: f64,
    pub volatility: f64,
    pub price_change: f64,
    pub volume_change: f64,
}

/// Classification of a detected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    PriceJump,
    HighVolatilitySpike,
    MomentumDriven,
}

impl AnomalyKind {
    /// Wire name, also used as the metrics label and storage column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::PriceJump => "price_jump",
            AnomalyKind::HighVolatilitySpike => "high_volatility_spike",
            AnomalyKind::MomentumDriven => "momentum_driven",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected anomaly, ready for distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub confidence: f64,
    pub details: String,
}

/// Message type of an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Price,
    Anomaly,
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Price => "price",
            MessageKind::Anomaly => "anomaly",
            MessageKind::Error => "error",
        }
    }
}

/// Payload of an outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    Quote(Quote),
    Anomaly(Anomaly),
    Text(String),
}

/// The outbound envelope delivered to subscribers:
/// `{"symbol": ..., "type": "price"|"anomaly"|"error", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: MessagePayload,
}

impl StreamMessage {
    pub fn price(quote: Quote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            kind: MessageKind::Price,
            data: MessagePayload::Quote(quote),
        }
    }

    pub fn anomaly(anomaly: Anomaly) -> Self {
        Self {
            symbol: anomaly.symbol.clone(),
            kind: MessageKind::Anomaly,
            data: MessagePayload::Anomaly(anomaly),
        }
    }

    pub fn error(symbol: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            kind: MessageKind::Error,
            data: MessagePayload::Text(details.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quote() -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            open: "189.0000".to_string(),
            high: "191.0500".to_string(),
            low: "188.5000".to_string(),
            price: "190.2500".to_string(),
            volume: "51234567".to_string(),
            latest_trading_day: "2024-06-14".to_string(),
            previous_close: "189.9000".to_string(),
            change: "0.3500".to_string(),
            change_percent: "0.1843%".to_string(),
        }
    }

    #[test]
    fn test_quote_numeric_parsing() {
        let quote = sample_quote();
        assert_eq!(quote.price_f64(), 190.25);
        assert_eq!(quote.volume_i64(), 51_234_567);
    }

    #[test]
    fn test_quote_parse_failure_defaults_to_zero() {
        let mut quote = sample_quote();
        quote.price = "n/a".to_string();
        quote.volume = "".to_string();
        assert_eq!(quote.price_f64(), 0.0);
        assert_eq!(quote.volume_i64(), 0);
    }

    #[test]
    fn test_quote_wire_casing() {
        let json = serde_json::to_value(sample_quote()).unwrap();
        assert!(json.get("Symbol").is_some());
        assert!(json.get("LatestTradingDay").is_some());
        assert!(json.get("ChangePercent").is_some());
    }

    #[test]
    fn test_anomaly_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&AnomalyKind::PriceJump).unwrap(),
            "\"price_jump\""
        );
        assert_eq!(
            serde_json::to_string(&AnomalyKind::HighVolatilitySpike).unwrap(),
            "\"high_volatility_spike\""
        );
    }

    #[test]
    fn test_envelope_round_trip() {
        let msg = StreamMessage::price(sample_quote());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"price\""));

        let back: StreamMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_error_envelope_carries_text() {
        let msg = StreamMessage::error("AAPL", "invalid action");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"], "invalid action");
    }
}
