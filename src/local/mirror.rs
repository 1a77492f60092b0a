//! Local Mirror
//!
//! Copies workouts, templates, favorite exercises and unit settings into the
//! `LocalCache` on every local change while no session is active, and loads
//! them back into the store on startup and sign-out.

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::local::cache::{CacheKey, CacheResult, LocalCache};
use crate::store::{
    CollectionKind, EventTarget, FitnessStore, Origin, SingletonKind, StoreEvent, UnitSettings,
    Workout, WorkoutTemplate,
};

/// Load the cached subset into the store
///
/// Entries that fail to decode are skipped with a warning. Returns the
/// number of workouts and templates loaded.
pub async fn hydrate(store: &FitnessStore, cache: &LocalCache) -> CacheResult<usize> {
    let mut loaded = 0;

    if let Some(workouts) = read_or_warn::<Vec<Workout>>(cache, CacheKey::Workouts)? {
        match store.replace_all(workouts, Origin::System).await {
            Ok(count) => loaded += count,
            Err(e) => tracing::warn!("Ignoring cached workouts: {}", e),
        }
    }
    if let Some(templates) = read_or_warn::<Vec<WorkoutTemplate>>(cache, CacheKey::WorkoutTemplates)? {
        match store.replace_all(templates, Origin::System).await {
            Ok(count) => loaded += count,
            Err(e) => tracing::warn!("Ignoring cached templates: {}", e),
        }
    }
    if let Some(favorites) = read_or_warn::<Vec<String>>(cache, CacheKey::FavoriteExercises)? {
        store.set_favorite_exercises(favorites, Origin::System).await;
    }
    if let Some(settings) = read_or_warn::<UnitSettings>(cache, CacheKey::UnitSettings)? {
        if let Err(e) = store.replace_singleton(settings, Origin::System).await {
            tracing::warn!("Ignoring cached unit settings: {}", e);
        }
    }

    tracing::info!(records = loaded, "Hydrated store from local cache");
    Ok(loaded)
}

fn read_or_warn<T: serde::de::DeserializeOwned>(
    cache: &LocalCache,
    key: CacheKey,
) -> CacheResult<Option<T>> {
    match cache.get::<T>(key) {
        Ok(value) => Ok(value),
        Err(crate::local::cache::CacheError::Serialization(e)) => {
            tracing::warn!(key = %key, "Discarding undecodable cache entry: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Which cache keys an event touches
fn keys_for(event: &StoreEvent) -> &'static [CacheKey] {
    match event.target {
        EventTarget::Collection(CollectionKind::Workouts) => &[CacheKey::Workouts],
        EventTarget::Collection(CollectionKind::Templates) => &[CacheKey::WorkoutTemplates],
        EventTarget::Favorites => &[CacheKey::FavoriteExercises],
        EventTarget::Singleton(SingletonKind::UnitSettings) => &[CacheKey::UnitSettings],
        EventTarget::All => ALL_KEYS,
        _ => &[],
    }
}

const ALL_KEYS: &[CacheKey] = &[
    CacheKey::Workouts,
    CacheKey::WorkoutTemplates,
    CacheKey::FavoriteExercises,
    CacheKey::UnitSettings,
];

/// Write one key's current store value to the cache
pub async fn persist(store: &FitnessStore, cache: &LocalCache, key: CacheKey) -> CacheResult<()> {
    match key {
        CacheKey::Workouts => cache.save_with_fallback(key, &store.list::<Workout>().await),
        CacheKey::WorkoutTemplates => {
            cache.save_with_fallback(key, &store.list::<WorkoutTemplate>().await)
        }
        CacheKey::FavoriteExercises => {
            cache.save_with_fallback(key, &store.favorite_exercises().await)
        }
        CacheKey::UnitSettings => cache.save_with_fallback(key, &store.unit_settings().await),
        CacheKey::HasMigrated => Ok(()),
    }
}

/// Write every mirrored key
pub async fn persist_all(store: &FitnessStore, cache: &LocalCache) -> CacheResult<()> {
    for &key in ALL_KEYS {
        persist(store, cache, key).await?;
    }
    Ok(())
}

/// Background task that mirrors local changes into the cache
pub struct LocalMirror {
    store: Arc<FitnessStore>,
    cache: Arc<LocalCache>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LocalMirror {
    pub fn new(store: Arc<FitnessStore>, cache: Arc<LocalCache>) -> Self {
        Self {
            store,
            cache,
            task: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    /// Start mirroring; a no-op if already running
    pub fn start(&self) {
        let Ok(mut task) = self.task.lock() else {
            tracing::error!("Local mirror lock poisoned");
            return;
        };
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let store = self.store.clone();
        let cache = self.cache.clone();
        let mut rx = store.subscribe();

        *task = Some(tokio::spawn(async move {
            loop {
                let keys: &[CacheKey] = match rx.recv().await {
                    Ok(event) if event.origin == Origin::Local => keys_for(&event),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Local mirror lagged, rewriting all keys");
                        ALL_KEYS
                    }
                    Err(RecvError::Closed) => break,
                };

                for &key in keys {
                    if let Err(e) = persist(&store, &cache, key).await {
                        tracing::error!(key = %key, "Failed to write local cache: {}", e);
                    }
                }
            }
        }));
        tracing::debug!("Local mirror started");
    }

    /// Stop mirroring
    pub fn stop(&self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
                tracing::debug!("Local mirror stopped");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|t| t.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for LocalMirror {
    fn drop(&mut self) {
        self.stop();
    }
}
