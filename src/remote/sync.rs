//! Sync Manager
//!
//! Keeps the store and the signed-in user's remote documents in step:
//!
//! - one subscription per collection and per singleton; each snapshot is
//!   merged into the store (last write wins per document)
//! - a push task writes every locally originated change back, one whole
//!   document at a time; changes that came from the remote are not echoed
//! - the store marks each local change as pending before publishing it;
//!   snapshots never override a pending document, and the push task
//!   releases the mark once the write is done
//! - favorite exercises never leave the device but are still written to
//!   the local cache while signed in
//! - failures are logged and counted, never retried
//!
//! Signing out, or signing in as someone else, drops every subscription,
//! clears the store and falls back to the local cache.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::local::{hydrate, persist, CacheKey, LocalCache, LocalMirror};
use crate::remote::document::{CollectionPath, DocumentStore, Subscription};
use crate::remote::error::{RemoteError, RemoteResult};
use crate::store::{
    now_millis, Change, CollectionKind, EventTarget, FitnessStore, SingletonKind, StoreEvent,
    UnitSettings, Workout, WorkoutTemplate,
};

/// How the user authenticated with the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    EmailPassword,
    #[serde(rename = "oauth")]
    OAuth { provider: String },
    Phone,
}

/// An authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub auth_method: AuthMethod,
    /// Bearer token for the document store
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl User {
    pub fn new(uid: impl Into<String>, auth_method: AuthMethod) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            auth_method,
            token: None,
        }
    }
}

/// Lifecycle of one collection's subscription
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    #[default]
    Unsubscribed,
    AwaitingFirstSnapshot,
    Synced,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct SyncStatus {
    pub signed_in: bool,
    pub uid: Option<String>,
    pub collections: BTreeMap<String, SubscriptionState>,
    pub snapshots_applied: u64,
    pub writes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    /// Unix ms of the last applied snapshot
    pub last_synced_at: Option<i64>,
}

impl SyncStatus {
    fn signed_out() -> Self {
        let mut status = Self::default();
        for name in target_names() {
            status.collections.insert(name, SubscriptionState::Unsubscribed);
        }
        status
    }

    /// Whether every subscription has delivered its first snapshot
    pub fn is_synced(&self) -> bool {
        self.signed_in
            && self
                .collections
                .values()
                .all(|s| *s == SubscriptionState::Synced)
    }
}

fn target_names() -> Vec<String> {
    CollectionKind::all()
        .iter()
        .map(|k| k.to_string())
        .chain(SingletonKind::all().iter().map(|k| k.to_string()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Copy the local cache into the remote store on first sign-in
    pub migrate_local_data: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            migrate_local_data: true,
        }
    }
}

/// State shared by the listener and push tasks
struct SyncContext {
    store: Arc<FitnessStore>,
    remote: Arc<dyn DocumentStore>,
    cache: Arc<LocalCache>,
    status: RwLock<SyncStatus>,
}

impl SyncContext {
    async fn set_state(&self, name: &str, state: SubscriptionState) {
        self.status
            .write()
            .await
            .collections
            .insert(name.to_string(), state);
    }

    async fn record_snapshot(&self, name: &str) {
        let mut status = self.status.write().await;
        status.collections.insert(name.to_string(), SubscriptionState::Synced);
        status.snapshots_applied += 1;
        status.last_synced_at = Some(now_millis());
    }

    async fn record_write(&self) {
        self.status.write().await.writes += 1;
    }

    async fn record_failure(&self, context: &str, error: &RemoteError) {
        tracing::error!(context, error = %error, "Remote sync operation failed");
        let mut status = self.status.write().await;
        status.failures += 1;
        status.last_error = Some(format!("{}: {}", context, error));
    }

    /// Replace the remote document with `data`
    ///
    /// Never a field merge: keys removed locally must disappear remotely.
    async fn write(&self, path: &CollectionPath, id: &str, data: serde_json::Value) -> RemoteResult<()> {
        self.remote.set(path, id, data, false).await?;
        self.record_write().await;
        Ok(())
    }

    /// Write one locally originated change to the remote store
    async fn push_event(&self, uid: &str, event: &StoreEvent) -> RemoteResult<()> {
        match (&event.target, &event.change) {
            (EventTarget::Collection(kind), Change::Added { id } | Change::Updated { id }) => {
                let path = CollectionPath::user(uid, kind.remote_name());
                match self.store.document(*kind, id).await? {
                    Some(data) => self.write(&path, id, data).await,
                    None => {
                        // A later Removed event deletes it remotely
                        tracing::warn!(
                            collection = %kind,
                            id = %id,
                            "Local record gone before it was pushed"
                        );
                        Ok(())
                    }
                }
            }
            (EventTarget::Collection(kind), Change::Removed { id }) => {
                let path = CollectionPath::user(uid, kind.remote_name());
                self.remote.delete(&path, id).await?;
                self.record_write().await;
                Ok(())
            }
            (EventTarget::Collection(kind), Change::Replaced { .. } | Change::Reset) => {
                self.push_collection(uid, *kind).await
            }
            (EventTarget::Singleton(kind), _) => self.push_singleton(uid, *kind).await,
            // Favorite exercises stay on the device
            (EventTarget::Favorites, _) => self.save_favorites().await,
            (EventTarget::All, _) => {
                for &kind in CollectionKind::all() {
                    self.push_collection(uid, kind).await?;
                }
                for &kind in SingletonKind::all() {
                    self.push_singleton(uid, kind).await?;
                }
                self.save_favorites().await
            }
        }
    }

    /// Make the remote collection match the local one
    async fn push_collection(&self, uid: &str, kind: CollectionKind) -> RemoteResult<()> {
        let path = CollectionPath::user(uid, kind.remote_name());
        let local = self.store.documents(kind).await?;

        let local_ids: HashSet<&str> = local.iter().map(|(id, _)| id.as_str()).collect();
        for stale in self.remote.list(&path).await? {
            if !local_ids.contains(stale.id.as_str()) {
                self.remote.delete(&path, &stale.id).await?;
                self.record_write().await;
            }
        }
        for (id, data) in local {
            self.write(&path, &id, data).await?;
        }
        Ok(())
    }

    async fn push_singleton(&self, uid: &str, kind: SingletonKind) -> RemoteResult<()> {
        let path = CollectionPath::user(uid, kind.remote_collection());
        let data = self.store.singleton_document(kind).await?;
        self.write(&path, kind.document_id(), data).await
    }

    async fn save_favorites(&self) -> RemoteResult<()> {
        persist(&self.store, &self.cache, CacheKey::FavoriteExercises).await?;
        Ok(())
    }
}

struct Session {
    user: User,
    tasks: Vec<JoinHandle<()>>,
}

pub struct SyncManager {
    ctx: Arc<SyncContext>,
    mirror: Arc<LocalMirror>,
    config: SyncConfig,
    session: Mutex<Option<Session>>,
}

impl SyncManager {
    pub fn new(
        store: Arc<FitnessStore>,
        remote: Arc<dyn DocumentStore>,
        mirror: Arc<LocalMirror>,
        config: SyncConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(SyncContext {
                store,
                remote,
                cache: mirror.cache().clone(),
                status: RwLock::new(SyncStatus::signed_out()),
            }),
            mirror,
            config,
            session: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<FitnessStore> {
        &self.ctx.store
    }

    pub async fn status(&self) -> SyncStatus {
        self.ctx.status.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.lock().await.as_ref().map(|s| s.user.clone())
    }

    /// Load the local cache into the store and start mirroring changes
    pub async fn start_offline(&self) {
        self.load_cache().await;
        self.mirror.start();
    }

    async fn load_cache(&self) {
        if let Err(e) = hydrate(&self.ctx.store, self.mirror.cache()).await {
            tracing::error!(error = %e, "Failed to hydrate store from local cache");
        }
    }

    /// Start syncing with `user`'s remote documents
    ///
    /// An existing session for another user is ended first, leaving the
    /// store as it would be after signing out.
    pub async fn sign_in(&self, user: User) -> RemoteResult<SyncStatus> {
        let mut session = self.session.lock().await;
        if let Some(existing) = session.as_ref() {
            if existing.user.uid == user.uid {
                return Ok(self.status().await);
            }
        }
        if let Some(previous) = session.take() {
            tracing::info!(uid = %previous.user.uid, next = %user.uid, "Switching user");
            self.end_session(previous).await;
        }

        self.mirror.stop();
        self.ctx.remote.set_token(user.token.clone());
        if self.config.migrate_local_data {
            match self.migrate(&user.uid).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(uid = %user.uid, count, "Migrated local data to remote store"),
                Err(e) => self.ctx.record_failure("migration", &e).await,
            }
        }

        {
            let mut status = self.ctx.status.write().await;
            *status = SyncStatus::signed_out();
            status.signed_in = true;
            status.uid = Some(user.uid.clone());
        }

        // Subscribe to store events before any snapshot can arrive, and
        // before marking so every mark reaches the push task
        let events = self.ctx.store.subscribe();
        self.ctx.store.pending_writes().enable();
        let mut tasks = vec![tokio::spawn(run_push(self.ctx.clone(), user.uid.clone(), events))];

        for &kind in CollectionKind::all() {
            let path = CollectionPath::user(&user.uid, kind.remote_name());
            match self.ctx.remote.subscribe(&path).await {
                Ok(subscription) => {
                    self.ctx
                        .set_state(&kind.to_string(), SubscriptionState::AwaitingFirstSnapshot)
                        .await;
                    tasks.push(tokio::spawn(run_collection_listener(
                        self.ctx.clone(),
                        kind,
                        subscription,
                    )));
                }
                Err(e) => self.ctx.record_failure(path.as_str(), &e).await,
            }
        }
        for &kind in SingletonKind::all() {
            let path = CollectionPath::user(&user.uid, kind.remote_collection());
            match self.ctx.remote.subscribe(&path).await {
                Ok(subscription) => {
                    self.ctx
                        .set_state(&kind.to_string(), SubscriptionState::AwaitingFirstSnapshot)
                        .await;
                    tasks.push(tokio::spawn(run_singleton_listener(
                        self.ctx.clone(),
                        kind,
                        subscription,
                    )));
                }
                Err(e) => self.ctx.record_failure(path.as_str(), &e).await,
            }
        }

        tracing::info!(uid = %user.uid, backend = self.ctx.remote.name(), "Signed in");
        *session = Some(Session { user, tasks });
        Ok(self.status().await)
    }

    /// End the session and fall back to the local cache
    pub async fn sign_out(&self) -> SyncStatus {
        let mut session = self.session.lock().await;
        let Some(previous) = session.take() else {
            return self.status().await;
        };
        let uid = previous.user.uid.clone();
        self.end_session(previous).await;
        self.mirror.start();

        tracing::info!(uid = %uid, "Signed out");
        self.status().await
    }

    /// Stop syncing and reload the store from the local cache
    async fn end_session(&self, previous: Session) {
        stop_tasks(previous);
        self.ctx.remote.set_token(None);
        self.ctx.store.pending_writes().disable();

        // The push task may not have seen the latest toggle
        if let Err(e) = self.ctx.save_favorites().await {
            tracing::error!(error = %e, "Failed to save favorite exercises");
        }

        *self.ctx.status.write().await = SyncStatus::signed_out();
        self.ctx.store.reset().await;
        self.load_cache().await;
    }

    /// Copy cached workouts, templates and unit settings to the remote store once
    async fn migrate(&self, uid: &str) -> RemoteResult<usize> {
        let cache = self.mirror.cache();
        if cache.has_migrated()? {
            return Ok(0);
        }

        let mut written = 0;
        let workouts: Vec<Workout> = cache.get(CacheKey::Workouts)?.unwrap_or_default();
        let path = CollectionPath::user(uid, CollectionKind::Workouts.remote_name());
        for workout in workouts {
            let id = workout.id.clone();
            self.ctx.write(&path, &id, serde_json::to_value(workout)?).await?;
            written += 1;
        }

        let templates: Vec<WorkoutTemplate> =
            cache.get(CacheKey::WorkoutTemplates)?.unwrap_or_default();
        let path = CollectionPath::user(uid, CollectionKind::Templates.remote_name());
        for template in templates {
            let id = template.id.clone();
            self.ctx.write(&path, &id, serde_json::to_value(template)?).await?;
            written += 1;
        }

        if let Some(settings) = cache.get::<UnitSettings>(CacheKey::UnitSettings)? {
            let kind = SingletonKind::UnitSettings;
            let path = CollectionPath::user(uid, kind.remote_collection());
            self.ctx
                .write(&path, kind.document_id(), serde_json::to_value(settings)?)
                .await?;
            written += 1;
        }

        cache.mark_migrated()?;
        Ok(written)
    }
}

fn stop_tasks(session: Session) {
    for task in session.tasks {
        task.abort();
    }
}

async fn run_push(ctx: Arc<SyncContext>, uid: String, mut events: broadcast::Receiver<StoreEvent>) {
    let pending = ctx.store.pending_writes();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Push task lagged, pushing full state");
                // Marks for the skipped events would never be released
                pending.clear();
                let event = StoreEvent::local(EventTarget::All, Change::Reset);
                pending.mark(&event);
                event
            }
            Err(RecvError::Closed) => break,
        };
        if !event.is_local() {
            continue;
        }
        if let Err(e) = ctx.push_event(&uid, &event).await {
            ctx.record_failure(&format!("push {}", event.target), &e).await;
        }
        pending.release(&event);
    }
}

async fn run_collection_listener(
    ctx: Arc<SyncContext>,
    kind: CollectionKind,
    mut subscription: Subscription,
) {
    let name = kind.to_string();
    while let Some(snapshot) = subscription.next().await {
        let documents = snapshot.into_iter().map(|d| (d.id, d.data)).collect();
        match ctx.store.apply_remote_documents(kind, documents).await {
            Ok(count) => {
                tracing::debug!(collection = %name, count, "Applied remote snapshot");
                ctx.record_snapshot(&name).await;
            }
            Err(e) => ctx.record_failure(&name, &RemoteError::from(e)).await,
        }
    }
    tracing::debug!(collection = %name, "Remote subscription closed");
}

async fn run_singleton_listener(
    ctx: Arc<SyncContext>,
    kind: SingletonKind,
    mut subscription: Subscription,
) {
    let name = kind.to_string();
    while let Some(snapshot) = subscription.next().await {
        if let Some(document) = snapshot.into_iter().find(|d| d.id == kind.document_id()) {
            if let Err(e) = ctx.store.apply_remote_singleton(kind, document.data).await {
                ctx.record_failure(&name, &RemoteError::from(e)).await;
                continue;
            }
        }
        ctx.record_snapshot(&name).await;
    }
    tracing::debug!(singleton = %name, "Remote subscription closed");
}
