//! Change notifications emitted by the store
//!
//! Every mutation publishes a `StoreEvent` on a broadcast channel. The
//! local mirror, the remote push task and the WebSocket hub all subscribe.

use serde::Serialize;

use crate::store::record::{CollectionKind, SingletonKind};

/// Where a change came from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A user action on this device
    Local,
    /// Applied from a remote snapshot; never written back
    Remote,
    /// Sync housekeeping (cache hydration, sign-out reset); never written back
    System,
}

/// What part of the data set changed
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum EventTarget {
    Collection(CollectionKind),
    Singleton(SingletonKind),
    Favorites,
    All,
}

impl std::fmt::Display for EventTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventTarget::Collection(kind) => write!(f, "{}", kind),
            EventTarget::Singleton(kind) => write!(f, "{}", kind),
            EventTarget::Favorites => write!(f, "favorites"),
            EventTarget::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Added { id: String },
    Updated { id: String },
    Removed { id: String },
    /// The whole target was swapped out
    Replaced { count: usize },
    /// Everything was cleared
    Reset,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreEvent {
    pub target: EventTarget,
    pub change: Change,
    pub origin: Origin,
}

impl StoreEvent {
    pub fn new(target: EventTarget, change: Change, origin: Origin) -> Self {
        Self {
            target,
            change,
            origin,
        }
    }

    pub fn local(target: EventTarget, change: Change) -> Self {
        Self::new(target, change, Origin::Local)
    }

    /// Whether this change should be written to the remote store
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }

    /// WebSocket topic for this event, e.g. `collections.workouts`
    pub fn topic(&self) -> String {
        format!("collections.{}", self.target)
    }
}
