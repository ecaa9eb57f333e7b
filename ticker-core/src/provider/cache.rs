// provider/cache.rs
//
// Short-TTL memoization of upstream responses, keyed by operation and
// symbol. Its job is to absorb duplicate near-simultaneous requests, not to
// provide freshness guarantees; errors are never cached.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use ticker_common::types::{DailyBar, Quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CacheOp {
    Quote,
    History,
}

/// The two response shapes share one key space, so the stored value is a
/// tagged variant rather than something dynamic.
#[derive(Debug, Clone)]
pub(crate) enum CachedValue {
    Quote(Quote),
    History(BTreeMap<String, DailyBar>),
}

struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

pub(crate) struct RequestCache {
    ttl: Duration,
    entries: RwLock<HashMap<(CacheOp, String), CacheEntry>>,
}

impl RequestCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached value iff it has not expired at serving time.
    pub fn get(&self, op: CacheOp, symbol: &str) -> Option<CachedValue> {
        let entries = self.entries.read();
        let entry = entries.get(&(op, symbol.to_string()))?;
        if entry.expires_at > Instant::now() {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, op: CacheOp, symbol: &str, value: CachedValue) {
        let mut entries = self.entries.write();
        entries.insert(
            (op, symbol.to_string()),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, price: &str) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            open: String::new(),
            high: String::new(),
            low: String::new(),
            price: price.to_string(),
            volume: "100".to_string(),
            latest_trading_day: String::new(),
            previous_close: String::new(),
            change: String::new(),
            change_percent: String::new(),
        }
    }

    #[test]
    fn test_fresh_entry_is_served_verbatim() {
        let cache = RequestCache::new(Duration::from_secs(60));
        cache.insert(CacheOp::Quote, "AAPL", CachedValue::Quote(quote("AAPL", "190.25")));

        match cache.get(CacheOp::Quote, "AAPL") {
            Some(CachedValue::Quote(q)) => {
                assert_eq!(q, quote("AAPL", "190.25"));
            }
            other => panic!("expected cached quote, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_entry_is_not_served() {
        let cache = RequestCache::new(Duration::from_millis(10));
        cache.insert(CacheOp::Quote, "AAPL", CachedValue::Quote(quote("AAPL", "190.25")));

        std::thread::sleep(Duration::from_millis(25));
        assert!(cache.get(CacheOp::Quote, "AAPL").is_none());
    }

    #[test]
    fn test_ops_do_not_collide() {
        let cache = RequestCache::new(Duration::from_secs(60));
        cache.insert(CacheOp::Quote, "AAPL", CachedValue::Quote(quote("AAPL", "1")));

        assert!(cache.get(CacheOp::History, "AAPL").is_none());
        assert!(cache.get(CacheOp::Quote, "TSLA").is_none());
    }
}
