//! In-process document store
//!
//! Backs tests and single-machine setups. Each collection keeps its
//! documents in id order and a `watch` channel that carries the latest
//! snapshot to subscribers. Writes can be made to fail on demand.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

use crate::remote::document::{merge_json, CollectionPath, Document, DocumentStore, Snapshot, Subscription};
use crate::remote::error::{RemoteError, RemoteResult};

struct Collection {
    documents: BTreeMap<String, Value>,
    tx: watch::Sender<Option<Snapshot>>,
}

impl Collection {
    fn new() -> Self {
        let (tx, _) = watch::channel(Some(Vec::new()));
        Self {
            documents: BTreeMap::new(),
            tx,
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.documents
            .iter()
            .map(|(id, data)| Document::new(id.clone(), data.clone()))
            .collect()
    }

    fn publish(&self) {
        self.tx.send_replace(Some(self.snapshot()));
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<CollectionPath, Collection>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`delete` fail until turned off
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes and deletes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection
    pub fn len(&self, path: &CollectionPath) -> usize {
        self.lock()
            .map(|c| c.get(path).map_or(0, |col| col.documents.len()))
            .unwrap_or(0)
    }

    fn lock(&self) -> RemoteResult<MutexGuard<'_, HashMap<CollectionPath, Collection>>> {
        self.collections
            .lock()
            .map_err(|_| RemoteError::Api {
                status: 500,
                message: "memory store lock poisoned".to_string(),
            })
    }

    fn check_writable(&self, path: &CollectionPath, id: &str) -> RemoteResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::WriteRejected(format!("{}/{}", path, id)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, path: &CollectionPath) -> RemoteResult<Snapshot> {
        Ok(self
            .lock()?
            .get(path)
            .map(Collection::snapshot)
            .unwrap_or_default())
    }

    async fn get(&self, path: &CollectionPath, id: &str) -> RemoteResult<Option<Document>> {
        Ok(self
            .lock()?
            .get(path)
            .and_then(|c| c.documents.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn set(
        &self,
        path: &CollectionPath,
        id: &str,
        data: Value,
        merge: bool,
    ) -> RemoteResult<()> {
        self.check_writable(path, id)?;
        let mut collections = self.lock()?;
        let collection = collections
            .entry(path.clone())
            .or_insert_with(Collection::new);

        match collection.documents.get_mut(id) {
            Some(existing) if merge => merge_json(existing, data),
            Some(existing) => *existing = data,
            None => {
                collection.documents.insert(id.to_string(), data);
            }
        }
        collection.publish();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> RemoteResult<()> {
        self.check_writable(path, id)?;
        let mut collections = self.lock()?;
        if let Some(collection) = collections.get_mut(path) {
            if collection.documents.remove(id).is_some() {
                collection.publish();
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, path: &CollectionPath) -> RemoteResult<Subscription> {
        let mut collections = self.lock()?;
        let collection = collections
            .entry(path.clone())
            .or_insert_with(Collection::new);
        Ok(Subscription::new(collection.tx.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryDocumentStore::new();
        let path = CollectionPath::user("u1", "workouts");

        store.set(&path, "w1", json!({"name": "Leg Day"}), false).await.unwrap();
        store.set(&path, "w1", json!({"notes": "heavy"}), true).await.unwrap();
        let doc = store.get(&path, "w1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"name": "Leg Day", "notes": "heavy"}));

        store.set(&path, "w1", json!({"name": "Push"}), false).await.unwrap();
        assert_eq!(store.get(&path, "w1").await.unwrap().unwrap().data, json!({"name": "Push"}));

        store.delete(&path, "w1").await.unwrap();
        assert!(store.get(&path, "w1").await.unwrap().is_none());
        assert!(store.list(&path).await.unwrap().is_empty());
        assert_eq!(store.write_count(), 4);
    }

    #[tokio::test]
    async fn test_subscription_sees_writes() {
        let store = MemoryDocumentStore::new();
        let path = CollectionPath::user("u1", "plans");

        let mut sub = store.subscribe(&path).await.unwrap();
        assert!(sub.next().await.unwrap().is_empty());

        store.set(&path, "p1", json!({"name": "Strength"}), true).await.unwrap();
        let snapshot = sub.next().await.unwrap();
        assert_eq!(snapshot, vec![Document::new("p1", json!({"name": "Strength"}))]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryDocumentStore::new();
        let path = CollectionPath::user("u1", "workouts");

        store.set_fail_writes(true);
        let err = store.set(&path, "w1", json!({}), true).await.unwrap_err();
        assert!(matches!(err, RemoteError::WriteRejected(_)));
        assert!(store.delete(&path, "w1").await.is_err());
        assert_eq!(store.write_count(), 0);

        store.set_fail_writes(false);
        store.set(&path, "w1", json!({}), true).await.unwrap();
        assert_eq!(store.len(&path), 1);
    }
}
