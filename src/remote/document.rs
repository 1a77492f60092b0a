//! Document store abstraction
//!
//! A hosted document database seen as collections of JSON documents under
//! slash-separated paths. Subscriptions deliver whole-collection snapshots.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::remote::error::RemoteResult;

/// One document: its id within the collection and its fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Full contents of a collection at one moment
pub type Snapshot = Vec<Document>;

/// Slash-separated collection path, e.g. `users/abc/workouts`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().trim_matches('/').to_string())
    }

    /// `users/{uid}/{collection}`
    pub fn user(uid: &str, collection: &str) -> Self {
        Self(format!("users/{}/{}", uid, collection))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A live view of one collection
///
/// Dropping the subscription unsubscribes.
pub struct Subscription {
    rx: watch::Receiver<Option<Snapshot>>,
    primed: bool,
    _feeder: Option<AbortOnDrop>,
}

impl Subscription {
    pub fn new(rx: watch::Receiver<Option<Snapshot>>) -> Self {
        Self {
            rx,
            primed: false,
            _feeder: None,
        }
    }

    /// A subscription fed by a background task that stops with it
    pub fn with_feeder(rx: watch::Receiver<Option<Snapshot>>, feeder: JoinHandle<()>) -> Self {
        Self {
            rx,
            primed: false,
            _feeder: Some(AbortOnDrop(feeder)),
        }
    }

    /// Wait for the next snapshot
    ///
    /// The first call returns the current snapshot right away if one is
    /// available. Returns `None` once the source is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if !self.primed {
            self.primed = true;
            let current = self.rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            if let Some(snapshot) = self.rx.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }
}

/// A hosted document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Credentials for subsequent calls; `None` signs out
    fn set_token(&self, _token: Option<String>) {}

    /// Every document in a collection
    async fn list(&self, path: &CollectionPath) -> RemoteResult<Snapshot>;

    async fn get(&self, path: &CollectionPath, id: &str) -> RemoteResult<Option<Document>>;

    /// Write a document; with `merge` the fields are merged into any existing ones
    async fn set(&self, path: &CollectionPath, id: &str, data: Value, merge: bool)
        -> RemoteResult<()>;

    async fn delete(&self, path: &CollectionPath, id: &str) -> RemoteResult<()>;

    /// Follow a collection
    async fn subscribe(&self, path: &CollectionPath) -> RemoteResult<Subscription>;
}

/// Merge `patch` into `target`, recursing into nested objects
pub fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                match existing.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths() {
        let path = CollectionPath::user("u1", "workouts");
        assert_eq!(path.as_str(), "users/u1/workouts");
        assert_eq!(path.segments().count(), 3);
        assert_eq!(CollectionPath::new("/users/u1/profile/").as_str(), "users/u1/profile");
    }

    #[test]
    fn test_merge_json() {
        let mut doc = json!({"name": "Leg Day", "meta": {"a": 1, "b": 2}, "tags": [1, 2]});
        merge_json(&mut doc, json!({"meta": {"b": 3, "c": 4}, "tags": [9], "notes": "x"}));
        assert_eq!(
            doc,
            json!({"name": "Leg Day", "meta": {"a": 1, "b": 3, "c": 4}, "tags": [9], "notes": "x"})
        );
    }

    #[tokio::test]
    async fn test_subscription_first_value_immediately() {
        let (tx, rx) = watch::channel(Some(vec![Document::new("a", json!({}))]));
        let mut sub = Subscription::new(rx);
        assert_eq!(sub.next().await.unwrap().len(), 1);

        tx.send_replace(Some(Vec::new()));
        assert!(sub.next().await.unwrap().is_empty());

        drop(tx);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_waits_for_first_snapshot() {
        let (tx, rx) = watch::channel(None);
        let mut sub = Subscription::new(rx);

        let waiter = tokio::spawn(async move { sub.next().await });
        tokio::task::yield_now().await;
        tx.send_replace(Some(vec![Document::new("b", json!({"x": 1}))]));

        let snapshot = waiter.await.unwrap().unwrap();
        assert_eq!(snapshot[0].id, "b");
    }
}
