// ingestion/source.rs
//
// Active-symbol discovery for the scheduler, modeled as a capability trait
// with composable implementations instead of closures handed across
// component boundaries.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::cache::HotSetCache;
use crate::hub::Hub;
use ticker_common::error::CacheError;

/// Source of the symbols worth polling right now.
#[async_trait]
pub trait ActiveSymbolSource: Send + Sync {
    async fn list(&self) -> Result<Vec<String>, CacheError>;
}

/// Fixed list, used as the last-resort fallback.
pub struct StaticSource {
    symbols: Vec<String>,
}

impl StaticSource {
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }
}

#[async_trait]
impl ActiveSymbolSource for StaticSource {
    async fn list(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.symbols.clone())
    }
}

/// Symbols with at least one live subscriber on this node, straight from
/// the hub registry.
pub struct HubSource {
    hub: Hub,
}

impl HubSource {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl ActiveSymbolSource for HubSource {
    async fn list(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.hub.list_active_symbols())
    }
}

/// Ranked hot symbols from the Redis sorted set.
pub struct HotSetSource {
    cache: Arc<HotSetCache>,
    limit: isize,
}

impl HotSetSource {
    pub fn new(cache: Arc<HotSetCache>, limit: isize) -> Self {
        Self { cache, limit }
    }
}

#[async_trait]
impl ActiveSymbolSource for HotSetSource {
    async fn list(&self) -> Result<Vec<String>, CacheError> {
        self.cache.hot_symbols(self.limit).await
    }
}

/// Composes a primary source with a fallback used when the primary errors
/// or comes back empty.
pub struct FallbackSource {
    primary: Arc<dyn ActiveSymbolSource>,
    fallback: Arc<dyn ActiveSymbolSource>,
}

impl FallbackSource {
    pub fn new(primary: Arc<dyn ActiveSymbolSource>, fallback: Arc<dyn ActiveSymbolSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ActiveSymbolSource for FallbackSource {
    async fn list(&self) -> Result<Vec<String>, CacheError> {
        match self.primary.list().await {
            Ok(symbols) if !symbols.is_empty() => Ok(symbols),
            Ok(_) => self.fallback.list().await,
            Err(e) => {
                warn!("active symbol source failed ({}); using fallback", e);
                self.fallback.list().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait]
    impl ActiveSymbolSource for FailingSource {
        async fn list(&self) -> Result<Vec<String>, CacheError> {
            Err(CacheError::Unavailable)
        }
    }

    fn static_source(symbols: &[&str]) -> Arc<StaticSource> {
        Arc::new(StaticSource::new(
            symbols.iter().map(|s| s.to_string()).collect(),
        ))
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = static_source(&["AAPL", "TSLA"]);
        assert_eq!(source.list().await.unwrap(), vec!["AAPL", "TSLA"]);
    }

    #[tokio::test]
    async fn test_fallback_on_error() {
        let source = FallbackSource::new(Arc::new(FailingSource), static_source(&["MSFT"]));
        assert_eq!(source.list().await.unwrap(), vec!["MSFT"]);
    }

    #[tokio::test]
    async fn test_fallback_on_empty() {
        let source = FallbackSource::new(static_source(&[]), static_source(&["MSFT"]));
        assert_eq!(source.list().await.unwrap(), vec!["MSFT"]);
    }

    #[tokio::test]
    async fn test_primary_wins_when_populated() {
        let source = FallbackSource::new(static_source(&["AAPL"]), static_source(&["MSFT"]));
        assert_eq!(source.list().await.unwrap(), vec!["AAPL"]);
    }

    #[tokio::test]
    async fn test_hub_source_reflects_registry() {
        let (hub, _task) = Hub::new();

        let id = uuid::Uuid::new_v4();
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        hub.register(id, tx);
        hub.subscribe(id, "NVDA");

        let source = HubSource::new(hub);
        assert_eq!(source.list().await.unwrap(), vec!["NVDA"]);
    }
}
