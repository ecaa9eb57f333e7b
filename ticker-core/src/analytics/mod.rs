// analytics/mod.rs

mod anomaly;
mod engine;

pub use anomaly::{AnomalyDetector, AnomalyThresholds};
pub use engine::AnalyticsEngine;
