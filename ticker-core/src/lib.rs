//! Real-time quote ingestion, analytics and fan-out service.
//!
//! The service polls a rate-limited upstream quote provider on a cadence,
//! runs every quote through a rolling-metrics engine and an anomaly
//! detector, persists raw quotes, and fans the resulting stream out to
//! WebSocket subscribers through a non-blocking broadcast hub.

pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod hub;
pub mod ingestion;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod resilience;
pub mod storage;
