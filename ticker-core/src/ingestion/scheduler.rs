// ingestion/scheduler.rs
//
// Polling loop against the rate-limited upstream. Single task: it is the
// sole writer of the per-symbol cadence map and the backoff counter. Fan-out
// happens downstream; this loop only feeds the sink.

use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{ActiveSymbolSource, QuoteSink};
use crate::config::IngestionSettings;
use crate::metrics;
use crate::provider::{ProviderError, QuoteProvider};
use crate::resilience::{BreakerError, CircuitBreaker};

pub struct IngestionScheduler {
    provider: Arc<dyn QuoteProvider>,
    breaker: Arc<CircuitBreaker>,
    source: Arc<dyn ActiveSymbolSource>,
    poll_interval: Duration,
    stagger: Duration,
    backoff_start: u32,
}

impl IngestionScheduler {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        breaker: Arc<CircuitBreaker>,
        source: Arc<dyn ActiveSymbolSource>,
        settings: &IngestionSettings,
    ) -> Self {
        Self {
            provider,
            breaker,
            source,
            poll_interval: settings.poll_interval(),
            stagger: settings.stagger(),
            backoff_start: settings.backoff_start,
        }
    }

    /// Run until shutdown. Wakes once a second, polls every due symbol in
    /// order, and sleeps out any pending rate-limit backoff before each
    /// request.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>, sink: Arc<dyn QuoteSink>) {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_polled: HashMap<String, Instant> = HashMap::new();
        let mut backoff: u32 = 0;

        info!("ingestion scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.recv() => {
                    info!("ingestion scheduler shutting down");
                    return;
                }
            }

            let symbols = match self.source.list().await {
                Ok(symbols) => symbols,
                Err(e) => {
                    warn!("active symbol lookup failed: {}", e);
                    continue;
                }
            };
            if symbols.is_empty() {
                continue;
            }

            for symbol in symbols {
                let due = last_polled
                    .get(&symbol)
                    .map(|at| at.elapsed() >= self.poll_interval)
                    .unwrap_or(true);
                if !due {
                    continue;
                }

                if backoff > 0 {
                    let jitter = rand::thread_rng().gen_range(0..1000);
                    let wait =
                        Duration::from_secs(1u64 << backoff) + Duration::from_millis(jitter);
                    warn!("rate limit backoff: waiting {:?}", wait);
                    if sleep_or_shutdown(wait, &mut shutdown_rx).await {
                        return;
                    }
                    backoff -= 1;
                }

                debug!("polling {}", symbol);

                let provider = Arc::clone(&self.provider);
                let poll_symbol = symbol.clone();
                let result = self
                    .breaker
                    .execute(move || async move { provider.quote(&poll_symbol).await })
                    .await;

                match result {
                    Ok(quote) => {
                        last_polled.insert(symbol, Instant::now());
                        sink.publish(quote).await;

                        // Stagger requests to avoid bursting the upstream.
                        if sleep_or_shutdown(self.stagger, &mut shutdown_rx).await {
                            return;
                        }
                    }
                    Err(BreakerError::Inner(ref e)) if e.is_rate_limit() => {
                        metrics::POLL_ERRORS.inc();
                        warn!("rate limited while polling {}; starting backoff", symbol);
                        backoff = self.backoff_start;
                    }
                    Err(e) => {
                        metrics::POLL_ERRORS.inc();
                        error!("error polling {}: {}", symbol, e);
                    }
                }
            }
        }
    }
}

/// Sleep for `duration`, returning true if shutdown arrived first.
async fn sleep_or_shutdown(duration: Duration, shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
    tokio::select! {
        _ = sleep(duration) => false,
        _ = shutdown_rx.recv() => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::StaticSource;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use ticker_common::types::{DailyBar, Quote};

    fn quote(symbol: &str) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            open: "100".into(),
            high: "101".into(),
            low: "99".into(),
            price: "100.5".into(),
            volume: "1000".into(),
            latest_trading_day: "2024-06-14".into(),
            previous_close: "100".into(),
            change: "0.5".into(),
            change_percent: "0.5%".into(),
        }
    }

    /// Scripted provider: pops one result per call and records call times.
    struct ScriptedProvider {
        script: Mutex<Vec<Result<Quote, ProviderError>>>,
        calls: Mutex<Vec<tokio::time::Instant>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Quote, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_times(&self) -> Vec<tokio::time::Instant> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl QuoteProvider for ScriptedProvider {
        async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
            self.calls.lock().push(tokio::time::Instant::now());
            let mut script = self.script.lock();
            if script.is_empty() {
                Ok(quote(symbol))
            } else {
                script.remove(0)
            }
        }

        async fn daily_history(
            &self,
            _symbol: &str,
        ) -> Result<BTreeMap<String, DailyBar>, ProviderError> {
            Ok(BTreeMap::new())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        quotes: Mutex<Vec<Quote>>,
    }

    #[async_trait]
    impl QuoteSink for RecordingSink {
        async fn publish(&self, quote: Quote) {
            self.quotes.lock().push(quote);
        }
    }

    fn settings(poll_interval_secs: u64) -> IngestionSettings {
        IngestionSettings {
            poll_interval_secs,
            stagger_secs: 2,
            backoff_start: 5,
            default_symbols: vec![],
        }
    }

    fn scheduler(
        provider: Arc<ScriptedProvider>,
        symbols: &[&str],
        poll_interval_secs: u64,
    ) -> IngestionScheduler {
        IngestionScheduler::new(
            provider,
            Arc::new(CircuitBreaker::new(100, Duration::from_secs(30))),
            Arc::new(StaticSource::new(
                symbols.iter().map(|s| s.to_string()).collect(),
            )),
            &settings(poll_interval_secs),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence_gate_limits_repolling() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let sink = Arc::new(RecordingSink::default());
        let (shutdown_tx, _) = broadcast::channel(1);

        let task = tokio::spawn(
            scheduler(provider.clone(), &["AAPL"], 30).run(shutdown_tx.subscribe(), sink.clone()),
        );

        tokio::time::sleep(Duration::from_secs(20)).await;
        let _ = shutdown_tx.send(());
        let _ = task.await;

        // 20 seconds of 1s wakes, but a 30s per-symbol cadence: one poll.
        assert_eq!(provider.call_times().len(), 1);
        assert_eq!(sink.quotes.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_resume_after_cadence_elapses() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let sink = Arc::new(RecordingSink::default());
        let (shutdown_tx, _) = broadcast::channel(1);

        let task = tokio::spawn(
            scheduler(provider.clone(), &["AAPL"], 30).run(shutdown_tx.subscribe(), sink.clone()),
        );

        tokio::time::sleep(Duration::from_secs(100)).await;
        let _ = shutdown_tx.send(());
        let _ = task.await;

        let polls = provider.call_times().len();
        assert!((3..=4).contains(&polls), "expected ~3 polls, got {}", polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_triggers_exponential_backoff() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::RateLimited)]));
        let sink = Arc::new(RecordingSink::default());
        let (shutdown_tx, _) = broadcast::channel(1);

        // Zero cadence so only the backoff gates polling.
        let task = tokio::spawn(
            scheduler(provider.clone(), &["AAPL"], 0).run(shutdown_tx.subscribe(), sink.clone()),
        );

        tokio::time::sleep(Duration::from_secs(90)).await;
        let _ = shutdown_tx.send(());
        let _ = task.await;

        let calls = provider.call_times();
        assert!(calls.len() >= 3, "expected backoff polls, got {}", calls.len());

        // First retry waits out the full 32s backoff step (plus jitter and
        // the next wake).
        let first_gap = calls[1] - calls[0];
        assert!(
            first_gap >= Duration::from_secs(32) && first_gap <= Duration::from_secs(35),
            "unexpected first backoff gap: {:?}",
            first_gap
        );

        // Second retry waits the halved step.
        let second_gap = calls[2] - calls[1];
        assert!(
            second_gap >= Duration::from_secs(16) && second_gap <= Duration::from_secs(20),
            "unexpected second backoff gap: {:?}",
            second_gap
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_do_not_backoff() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Transport("connection reset".into())),
            Ok(quote("AAPL")),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let (shutdown_tx, _) = broadcast::channel(1);

        let task = tokio::spawn(
            scheduler(provider.clone(), &["AAPL"], 0).run(shutdown_tx.subscribe(), sink.clone()),
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        let _ = shutdown_tx.send(());
        let _ = task.await;

        // The failed poll is followed by an ordinary 1s-wake retry, not a
        // 32-second backoff.
        assert!(provider.call_times().len() >= 2);
        assert_eq!(sink.quotes.lock().len(), provider.call_times().len() - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_symbol_list_means_no_polls() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let sink = Arc::new(RecordingSink::default());
        let (shutdown_tx, _) = broadcast::channel(1);

        let task = tokio::spawn(
            scheduler(provider.clone(), &[], 0).run(shutdown_tx.subscribe(), sink.clone()),
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        let _ = shutdown_tx.send(());
        let _ = task.await;

        assert!(provider.call_times().is_empty());
    }
}
