//! WebSocket Connection Hub
//!
//! Manages all WebSocket connections, their topic subscriptions and
//! fan-out of store change events.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent};
use crate::store::{CollectionKind, SingletonKind, StoreEvent};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

type Connections = Arc<RwLock<HashMap<ConnectionId, ConnectionHandle>>>;
type Subscriptions = Arc<RwLock<HashMap<String, HashSet<ConnectionId>>>>;

pub struct ConnectionHub {
    connections: Connections,
    /// Topic → subscribed connections
    subscriptions: Subscriptions,
    config: HubConfig,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    pub subscriptions: HashSet<String>,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Register a new WebSocket connection
    ///
    /// Fails once the connection limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                subscriptions: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and clean up its subscriptions
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.subscriptions.write().await;
            for topic in handle.subscriptions {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Subscribe a connection to topics; unknown topics are skipped
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_valid_topic(&topic) {
                tracing::warn!(topic = %topic, "Invalid topic ignored");
                continue;
            }
            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone()).or_default().insert(id.to_string());
            subscribed.push(topic);
        }

        tracing::debug!(connection_id = %id, topics = ?subscribed, "Subscribed to topics");
        Ok(subscribed)
    }

    pub async fn unsubscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
                unsubscribed.push(topic);
            }
        }

        tracing::debug!(connection_id = %id, topics = ?unsubscribed, "Unsubscribed from topics");
        Ok(unsubscribed)
    }

    /// Send an event to every subscriber of its topic
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        deliver(&self.connections, &self.subscriptions, event).await
    }

    /// Broadcast without waiting
    pub fn publish(&self, event: WsEvent) {
        let connections = Arc::clone(&self.connections);
        let subscriptions = Arc::clone(&self.subscriptions);
        tokio::spawn(async move {
            deliver(&connections, &subscriptions, &event).await;
        });
    }

    /// Forward every store change to subscribers until the store goes away
    pub fn forward_store_events(&self, mut events: broadcast::Receiver<StoreEvent>) -> JoinHandle<()> {
        let connections = Arc::clone(&self.connections);
        let subscriptions = Arc::clone(&self.subscriptions);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        deliver(&connections, &subscriptions, &WsEvent::from(event)).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "WebSocket fan-out lagged behind store events");
                        let notice = WsEvent::system(format!("{} changes skipped, reload", skipped));
                        deliver(&connections, &subscriptions, &notice).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;
        handle.sender.send(message).map_err(|_| HubError::SendFailed)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

async fn deliver(connections: &Connections, subscriptions: &Subscriptions, event: &WsEvent) -> usize {
    let subs = subscriptions.read().await;
    let connections = connections.read().await;

    // "collections.*" matches "collections.workouts"
    let wildcard = event
        .topic
        .split_once('.')
        .map(|(prefix, _)| format!("{}.*", prefix));

    let mut ids: HashSet<&ConnectionId> = HashSet::new();
    if let Some(direct) = subs.get(&event.topic) {
        ids.extend(direct);
    }
    if let Some(matched) = wildcard.and_then(|t| subs.get(&t)) {
        ids.extend(matched);
    }

    let mut sent = 0;
    for id in ids {
        if let Some(handle) = connections.get(id) {
            if handle.sender.send(event.message.clone()).is_ok() {
                sent += 1;
            }
        }
    }

    if sent > 0 {
        tracing::trace!(topic = %event.topic, subscribers = sent, "Broadcast event");
    }
    sent
}

/// `collections.*`, `collections.{name}` for a known collection or singleton,
/// `collections.favorites`, `collections.all` and `system`
fn is_valid_topic(topic: &str) -> bool {
    if topic == "system" {
        return true;
    }
    let Some(name) = topic.strip_prefix("collections.") else {
        return false;
    };
    name == "*"
        || name == "favorites"
        || name == "all"
        || CollectionKind::all().iter().any(|k| k.to_string() == name)
        || SingletonKind::all().iter().any(|k| k.to_string() == name)
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}
