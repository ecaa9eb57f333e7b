// ingestion/mod.rs
//
// Quote ingestion: the polling scheduler, the active-symbol sources that
// drive it, and the historical replay engine. Both producers push into the
// same sink so everything downstream sees one stream.

mod replay;
mod scheduler;
mod source;

pub use replay::ReplayEngine;
pub use scheduler::IngestionScheduler;
pub use source::{ActiveSymbolSource, FallbackSource, HotSetSource, HubSource, StaticSource};

use async_trait::async_trait;

use ticker_common::types::Quote;

/// Consumer of ingested quotes. The pipeline implements this; tests swap in
/// recorders.
#[async_trait]
pub trait QuoteSink: Send + Sync {
    async fn publish(&self, quote: Quote);
}
