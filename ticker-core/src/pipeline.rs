// pipeline.rs - per-quote processing chain
//
// Runs on the producer's task for every arriving quote: analytics, anomaly
// detection, persistence, then distribution. The hub enforces non-blocking
// enqueue, so this never waits on a subscriber.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::analytics::{AnalyticsEngine, AnomalyDetector};
use crate::cache::HotSetCache;
use crate::hub::Hub;
use crate::ingestion::QuoteSink;
use crate::metrics;
use crate::storage::Storage;
use ticker_common::types::{Quote, StreamMessage};

pub struct QuotePipeline {
    engine: AnalyticsEngine,
    detector: AnomalyDetector,
    storage: Option<Arc<Storage>>,
    hot_set: Option<Arc<HotSetCache>>,
    hub: Hub,
}

impl QuotePipeline {
    pub fn new(
        engine: AnalyticsEngine,
        detector: AnomalyDetector,
        storage: Option<Arc<Storage>>,
        hot_set: Option<Arc<HotSetCache>>,
        hub: Hub,
    ) -> Self {
        Self {
            engine,
            detector,
            storage,
            hot_set,
            hub,
        }
    }
}

#[async_trait]
impl QuoteSink for QuotePipeline {
    async fn publish(&self, quote: Quote) {
        let price = quote.price_f64();
        let volume = quote.volume_i64();

        let snapshot = self.engine.process(&quote.symbol, price, volume as f64);
        metrics::UPDATES_PROCESSED
            .with_label_values(&[&quote.symbol])
            .inc();

        if let Some(anomaly) = self.detector.detect(&snapshot) {
            metrics::ANOMALIES_DETECTED
                .with_label_values(&[&quote.symbol, anomaly.kind.as_str()])
                .inc();

            if let Some(storage) = &self.storage {
                if let Err(e) = storage.save_anomaly(&anomaly).await {
                    warn!("failed to persist anomaly for {}: {}", quote.symbol, e);
                }
            }

            self.hub.broadcast(StreamMessage::anomaly(anomaly));
        }

        if let Some(storage) = &self.storage {
            let started = Instant::now();
            if let Err(e) = storage.save_quote(&quote.symbol, price, volume).await {
                warn!("failed to persist quote for {}: {}", quote.symbol, e);
            }
            metrics::DB_LATENCY.observe(started.elapsed().as_secs_f64());
        }

        if let Some(hot_set) = &self.hot_set {
            if let Err(e) = hot_set.set_snapshot(&snapshot).await {
                debug!("failed to cache snapshot for {}: {}", quote.symbol, e);
            }
        }

        self.hub.broadcast(StreamMessage::price(quote));
    }
}
