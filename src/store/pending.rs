//! Pending local writes
//!
//! While a sync session is active, every locally originated change marks
//! the documents it touched before the change event is published. The
//! push task releases the mark once the write reached the remote store.
//! Snapshot merges leave marked documents in their local form, so a
//! snapshot that was already in flight cannot undo or drop a local edit.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::store::events::{Change, EventTarget, StoreEvent};
use crate::store::record::{CollectionKind, SingletonKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PendingKey {
    /// One document, by remote collection name and id
    Document { collection: &'static str, id: String },
    /// A whole collection is being rewritten
    Collection(&'static str),
}

fn singleton_key(kind: SingletonKind) -> PendingKey {
    PendingKey::Document {
        collection: kind.remote_collection(),
        id: kind.document_id().to_string(),
    }
}

/// Documents an event will write remotely
fn keys_for(event: &StoreEvent) -> Vec<PendingKey> {
    match (&event.target, &event.change) {
        (
            EventTarget::Collection(kind),
            Change::Added { id } | Change::Updated { id } | Change::Removed { id },
        ) => vec![PendingKey::Document {
            collection: kind.remote_name(),
            id: id.clone(),
        }],
        (EventTarget::Collection(kind), Change::Replaced { .. } | Change::Reset) => {
            vec![PendingKey::Collection(kind.remote_name())]
        }
        (EventTarget::Singleton(kind), _) => vec![singleton_key(*kind)],
        (EventTarget::Favorites, _) => Vec::new(),
        (EventTarget::All, _) => CollectionKind::all()
            .iter()
            .map(|kind| PendingKey::Collection(kind.remote_name()))
            .chain(SingletonKind::all().iter().map(|&kind| singleton_key(kind)))
            .collect(),
    }
}

/// Reference-counted marks on documents with a local write in flight
#[derive(Default)]
pub struct PendingWrites {
    tracking: AtomicBool,
    inner: Mutex<HashMap<PendingKey, usize>>,
}

impl PendingWrites {
    /// Start marking local changes
    pub fn enable(&self) {
        self.tracking.store(true, Ordering::SeqCst);
    }

    /// Stop marking and forget every mark
    pub fn disable(&self) {
        self.tracking.store(false, Ordering::SeqCst);
        self.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.tracking.load(Ordering::SeqCst)
    }

    /// Mark what `event` touches; a no-op while disabled
    pub fn mark(&self, event: &StoreEvent) {
        if !self.is_enabled() {
            return;
        }
        let Ok(mut inner) = self.inner.lock() else {
            tracing::error!("Pending write lock poisoned");
            return;
        };
        for key in keys_for(event) {
            *inner.entry(key).or_insert(0) += 1;
        }
    }

    /// Undo one `mark` for `event`
    pub fn release(&self, event: &StoreEvent) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        for key in keys_for(event) {
            if let Some(count) = inner.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    inner.remove(&key);
                }
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.clear();
        }
    }

    /// Whether a whole-collection rewrite is in flight
    pub fn collection_pending(&self, collection: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| {
                inner
                    .keys()
                    .any(|key| matches!(key, PendingKey::Collection(c) if *c == collection))
            })
            .unwrap_or(false)
    }

    /// Ids of single documents in flight within `collection`
    pub fn document_ids(&self, collection: &str) -> HashSet<String> {
        self.inner
            .lock()
            .map(|inner| {
                inner
                    .keys()
                    .filter_map(|key| match key {
                        PendingKey::Document { collection: c, id } if *c == collection => {
                            Some(id.clone())
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `id` in `collection` is in flight, on its own or as part of the collection
    pub fn is_pending(&self, collection: &str, id: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| {
                inner.keys().any(|key| match key {
                    PendingKey::Document { collection: c, id: i } => *c == collection && i == id,
                    PendingKey::Collection(c) => *c == collection,
                })
            })
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().map(|inner| inner.is_empty()).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updated(kind: CollectionKind, id: &str) -> StoreEvent {
        StoreEvent::local(EventTarget::Collection(kind), Change::Updated { id: id.to_string() })
    }

    #[test]
    fn test_marks_only_while_enabled() {
        let pending = PendingWrites::default();
        pending.mark(&updated(CollectionKind::Workouts, "w1"));
        assert!(pending.is_empty());

        pending.enable();
        pending.mark(&updated(CollectionKind::Workouts, "w1"));
        pending.mark(&updated(CollectionKind::Workouts, "w1"));
        assert!(pending.is_pending("workouts", "w1"));
        assert!(!pending.is_pending("workoutPlans", "w1"));

        pending.release(&updated(CollectionKind::Workouts, "w1"));
        assert_eq!(pending.document_ids("workouts").len(), 1);
        pending.release(&updated(CollectionKind::Workouts, "w1"));
        assert!(pending.is_empty());

        // Releasing something never marked is harmless
        pending.release(&updated(CollectionKind::Workouts, "w1"));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_collection_and_singleton_keys() {
        let pending = PendingWrites::default();
        pending.enable();

        let replaced = StoreEvent::local(
            EventTarget::Collection(CollectionKind::Plans),
            Change::Replaced { count: 3 },
        );
        pending.mark(&replaced);
        assert!(pending.collection_pending("workoutPlans"));
        assert!(pending.is_pending("workoutPlans", "anything"));
        assert!(pending.document_ids("workoutPlans").is_empty());

        let units = StoreEvent::local(
            EventTarget::Singleton(SingletonKind::UnitSettings),
            Change::Replaced { count: 1 },
        );
        pending.mark(&units);
        assert!(pending.is_pending("settings", "units"));

        let favorites = StoreEvent::local(EventTarget::Favorites, Change::Replaced { count: 1 });
        pending.mark(&favorites);

        pending.disable();
        assert!(pending.is_empty());
        assert!(!pending.is_enabled());
    }
}
