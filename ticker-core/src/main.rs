use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use ticker_common::logging::{init_logging, LogConfig};
use ticker_common::validation::SymbolValidator;

use ticker_core::analytics::{AnalyticsEngine, AnomalyDetector, AnomalyThresholds};
use ticker_core::api::{self, ApiState};
use ticker_core::cache::HotSetCache;
use ticker_core::config::Settings;
use ticker_core::hub::Hub;
use ticker_core::ingestion::{
    ActiveSymbolSource, FallbackSource, HotSetSource, HubSource, IngestionScheduler, QuoteSink,
    StaticSource,
};
use ticker_core::metrics;
use ticker_core::pipeline::QuotePipeline;
use ticker_core::provider::{AlphaVantageClient, QuoteProvider};
use ticker_core::resilience::CircuitBreaker;
use ticker_core::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    init_logging(LogConfig::from_env().with_default_level("ticker_core=info,sqlx=warn"))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let settings = Settings::new().context("loading configuration")?;
    metrics::register_metrics().context("registering metrics")?;

    // Optional collaborators: the pipeline degrades rather than aborting
    // when either is unreachable.
    let storage = match Storage::connect(&settings.database.url, settings.database.max_connections)
        .await
    {
        Ok(storage) => Some(Arc::new(storage)),
        Err(e) => {
            warn!("database connection failed ({}); continuing without persistence", e);
            None
        }
    };

    let hot_set = match HotSetCache::connect(&settings.redis.url, settings.redis.snapshot_ttl_secs)
    {
        Ok(cache) => Some(Arc::new(cache)),
        Err(e) => {
            warn!("redis connection failed ({}); hot-set features disabled", e);
            None
        }
    };

    let provider = Arc::new(
        AlphaVantageClient::new(
            settings.provider.api_key.clone(),
            settings.provider.base_url.clone(),
            settings.provider.cache_ttl(),
            settings.provider.request_timeout(),
        )
        .context("building upstream client")?,
    );

    let breaker = Arc::new(CircuitBreaker::new(
        settings.breaker.failure_threshold,
        settings.breaker.reset_timeout(),
    ));

    let (shutdown_tx, _) = broadcast::channel(8);

    let (hub, hub_task) = Hub::new();
    tokio::spawn(hub_task.run(shutdown_tx.subscribe()));

    // Active-symbol discovery: ranked hot set when Redis is up, then local
    // subscriber interest, then the configured defaults.
    let static_source: Arc<dyn ActiveSymbolSource> = Arc::new(StaticSource::new(
        settings.ingestion.default_symbols.clone(),
    ));
    let hub_fallback: Arc<dyn ActiveSymbolSource> = Arc::new(FallbackSource::new(
        Arc::new(HubSource::new(hub.clone())),
        static_source,
    ));
    let symbol_source: Arc<dyn ActiveSymbolSource> = match &hot_set {
        Some(cache) => Arc::new(FallbackSource::new(
            Arc::new(HotSetSource::new(
                Arc::clone(cache),
                settings.redis.hot_set_limit,
            )),
            hub_fallback,
        )),
        None => hub_fallback,
    };

    let pipeline: Arc<dyn QuoteSink> = Arc::new(QuotePipeline::new(
        AnalyticsEngine::new(settings.analytics.window),
        AnomalyDetector::new(AnomalyThresholds {
            price_jump_pct: settings.analytics.price_jump_pct,
            volatility: settings.analytics.volatility_threshold,
        }),
        storage,
        hot_set.clone(),
        hub.clone(),
    ));

    let scheduler = IngestionScheduler::new(
        Arc::clone(&provider) as Arc<dyn QuoteProvider>,
        breaker,
        symbol_source,
        &settings.ingestion,
    );
    tokio::spawn(scheduler.run(shutdown_tx.subscribe(), pipeline));

    let state = ApiState {
        hub,
        provider: provider as Arc<dyn QuoteProvider>,
        hot_set,
        validator: SymbolValidator::new(),
        queue_capacity: settings.hub.client_queue_capacity,
    };
    let app = api::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("ticker-core listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("serving HTTP")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(());
}
