//! Remote Document Sync
//!
//! Keeps the store in step with a hosted document database per user:
//!
//! - **document**: The `DocumentStore` trait, paths and subscriptions
//! - **memory**: In-process document store
//! - **rest**: HTTP client for a hosted document API
//! - **sync**: Sign-in/sign-out lifecycle, listeners and the push task
//! - **error**: Error types

pub mod document;
pub mod error;
pub mod memory;
pub mod rest;
pub mod sync;

pub use document::{merge_json, CollectionPath, Document, DocumentStore, Snapshot, Subscription};
pub use error::{RemoteError, RemoteResult};
pub use memory::MemoryDocumentStore;
pub use rest::{RestConfig, RestDocumentStore};
pub use sync::{AuthMethod, SubscriptionState, SyncConfig, SyncManager, SyncStatus, User};
