// analytics/anomaly.rs
//
// Stateless classifier over a metrics snapshot. The rules are deliberately
// coarse; first match wins.

use ticker_common::types::{Anomaly, AnomalyKind, RollingMetrics};

/// Detection thresholds, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyThresholds {
    /// Absolute window price change (percent) treated as a jump
    pub price_jump_pct: f64,
    /// Standard deviation above which trading is considered aggressive
    pub volatility: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            price_jump_pct: 2.0,
            volatility: 1.0,
        }
    }
}

/// Stateless anomaly detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
}

impl AnomalyDetector {
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify one metrics snapshot. Returns `None` when nothing stands
    /// out.
    pub fn detect(&self, metrics: &RollingMetrics) -> Option<Anomaly> {
        if metrics.price_change.abs() > self.thresholds.price_jump_pct {
            return Some(Anomaly {
                symbol: metrics.symbol.clone(),
                kind: AnomalyKind::PriceJump,
                confidence: f64::min(0.95, 0.5 + metrics.price_change.abs() / 10.0),
                details: format!(
                    "Sudden momentum shift: {:.2}% price move detected.",
                    metrics.price_change
                ),
            });
        }

        if metrics.volatility > self.thresholds.volatility && metrics.vwap > 0.0 {
            return Some(Anomaly {
                symbol: metrics.symbol.clone(),
                kind: AnomalyKind::HighVolatilitySpike,
                confidence: 0.8,
                details: "Aggressive trading activity detected with elevated volatility."
                    .to_string(),
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price_change: f64, volatility: f64, vwap: f64) -> RollingMetrics {
        RollingMetrics {
            symbol: "AAPL".to_string(),
            vwap,
            volatility,
            price_change,
            volume_change: 0.0,
        }
    }

    #[test]
    fn test_price_jump_detected() {
        let detector = AnomalyDetector::default();
        let anomaly = detector.detect(&snapshot(3.0, 0.0, 100.0)).unwrap();

        assert_eq!(anomaly.kind, AnomalyKind::PriceJump);
        assert!((anomaly.confidence - 0.8).abs() < 1e-9);
        assert!(anomaly.details.contains("3.00%"));
    }

    #[test]
    fn test_negative_jump_detected() {
        let detector = AnomalyDetector::default();
        let anomaly = detector.detect(&snapshot(-4.5, 0.0, 100.0)).unwrap();

        assert_eq!(anomaly.kind, AnomalyKind::PriceJump);
        assert!((anomaly.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_is_capped() {
        let detector = AnomalyDetector::default();
        let anomaly = detector.detect(&snapshot(40.0, 0.0, 100.0)).unwrap();
        assert!((anomaly.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_spike_detected() {
        let detector = AnomalyDetector::default();
        // |price change| of 1.0 stays below the jump threshold.
        let anomaly = detector.detect(&snapshot(-1.0, 1.414, 100.0)).unwrap();

        assert_eq!(anomaly.kind, AnomalyKind::HighVolatilitySpike);
        assert!((anomaly.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_price_jump_wins_over_volatility() {
        let detector = AnomalyDetector::default();
        let anomaly = detector.detect(&snapshot(5.0, 9.0, 100.0)).unwrap();
        assert_eq!(anomaly.kind, AnomalyKind::PriceJump);
    }

    #[test]
    fn test_volatility_requires_positive_vwap() {
        let detector = AnomalyDetector::default();
        assert!(detector.detect(&snapshot(0.0, 5.0, 0.0)).is_none());
    }

    #[test]
    fn test_quiet_market_is_clean() {
        let detector = AnomalyDetector::default();
        assert!(detector.detect(&snapshot(0.5, 0.3, 100.0)).is_none());
    }

    #[test]
    fn test_custom_thresholds() {
        let detector = AnomalyDetector::new(AnomalyThresholds {
            price_jump_pct: 10.0,
            volatility: 3.0,
        });
        assert!(detector.detect(&snapshot(5.0, 2.0, 100.0)).is_none());
        assert!(detector.detect(&snapshot(11.0, 0.0, 100.0)).is_some());
    }
}
