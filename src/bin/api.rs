//! IronLog API Server
//!
//! Run with: cargo run --bin ironlog-api
//!
//! # Configuration
//!
//! Read from the first of `$CONFIG/ironlog/config.toml`,
//! `/etc/ironlog/config.toml` and `./config.toml`, then overridden by:
//! - `IRONLOG_API_HOST`, `IRONLOG_API_PORT`: Bind address (default: 0.0.0.0:8090)
//! - `IRONLOG_DATA_DIR`: Directory holding `cache.db`
//! - `IRONLOG_CACHE_QUOTA_BYTES`: Offline cache quota
//! - `IRONLOG_REMOTE_BACKEND`: `memory` (default) or `rest`
//! - `IRONLOG_REMOTE_URL`, `IRONLOG_REMOTE_PROJECT`: Hosted document store
//! - `IRONLOG_LOG_LEVEL`, `IRONLOG_LOG_FORMAT`: `pretty` or `json`
//! - `RUST_LOG`: Takes precedence over the configured level

use ironlog::api::{serve, ApiConfig, AppState};
use ironlog::config::{Config, LoggingConfig, RemoteBackend};
use ironlog::local::LocalCache;
use ironlog::remote::{DocumentStore, MemoryDocumentStore, RestDocumentStore};
use ironlog::store::{FitnessStore, Origin};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    init_tracing(&config.logging);

    tracing::info!("Starting IronLog API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data directory: {}", config.storage.data_dir);

    let cache = Arc::new(LocalCache::open(
        Path::new(&config.storage.data_dir),
        config.storage.cache_quota_bytes,
    )?);
    tracing::info!(quota_bytes = cache.quota_bytes(), "Local cache opened");

    let remote: Arc<dyn DocumentStore> = match config.remote.backend {
        RemoteBackend::Memory => {
            tracing::info!("Using in-process document store (data is not shared)");
            Arc::new(MemoryDocumentStore::new())
        }
        RemoteBackend::Rest => {
            let rest = config.remote.rest_config(config.api.request_timeout_secs);
            tracing::info!(
                base_url = %rest.base_url,
                project = %rest.project_id,
                "Using hosted document store"
            );
            Arc::new(RestDocumentStore::new(rest)?)
        }
    };

    let store = Arc::new(FitnessStore::new());
    let api_config = ApiConfig::from(&config.api);
    let state = AppState::new(
        Arc::clone(&store),
        cache,
        remote,
        config.remote.sync_config(),
        api_config.clone(),
    );

    state.sync.start_offline().await;
    apply_default_units(&store, &config).await;

    let stats = store.stats().await;
    tracing::info!(records = stats.total_records, "Store hydrated from local cache");

    serve(state, &api_config).await?;

    tracing::info!("IronLog API server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ironlog={},tower_http=debug", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Seed unit settings from config when the user never picked any
async fn apply_default_units(store: &FitnessStore, config: &Config) {
    if store.unit_settings().await.updated_at != 0 {
        return;
    }
    if let Err(e) = store
        .replace_singleton(config.units.settings(), Origin::System)
        .await
    {
        tracing::warn!(error = %e, "Ignoring configured default units");
    }
}
