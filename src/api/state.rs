//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::local::{LocalCache, LocalMirror, DEFAULT_QUOTA_BYTES};
use crate::remote::{DocumentStore, MemoryDocumentStore, SyncConfig, SyncManager};
use crate::store::FitnessStore;
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FitnessStore>,
    /// Session lifecycle and remote sync
    pub sync: Arc<SyncManager>,
    pub cache: Arc<LocalCache>,
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    pub ws_hub: Arc<ConnectionHub>,
}

impl AppState {
    /// Wire the store, cache and remote store together
    ///
    /// Must be called inside a Tokio runtime: store changes are forwarded
    /// to WebSocket clients by a spawned task.
    pub fn new(
        store: Arc<FitnessStore>,
        cache: Arc<LocalCache>,
        remote: Arc<dyn DocumentStore>,
        sync_config: SyncConfig,
        config: ApiConfig,
    ) -> Self {
        let mirror = Arc::new(LocalMirror::new(Arc::clone(&store), Arc::clone(&cache)));
        let sync = Arc::new(SyncManager::new(
            Arc::clone(&store),
            remote,
            mirror,
            sync_config,
        ));

        let ws_hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        ws_hub.forward_store_events(store.subscribe());

        Self {
            store,
            sync,
            cache,
            config: Arc::new(config),
            start_time: Instant::now(),
            ws_hub,
        }
    }

    /// Everything in memory; nothing touches disk or network
    pub fn in_memory(config: ApiConfig) -> Result<Self, crate::local::CacheError> {
        Ok(Self::new(
            Arc::new(FitnessStore::new()),
            Arc::new(LocalCache::in_memory(DEFAULT_QUOTA_BYTES)?),
            Arc::new(MemoryDocumentStore::new()),
            SyncConfig::default(),
            config,
        ))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size in bytes (imports can be large)
    pub max_body_size: usize,
    /// Origins allowed by CORS; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            max_body_size: 10 * 1024 * 1024, // 10MB
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl From<&crate::config::ApiConfig> for ApiConfig {
    fn from(config: &crate::config::ApiConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            cors_origins: config.cors_origins.clone(),
            ..Default::default()
        }
    }
}
