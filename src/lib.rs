//! # IronLog
//!
//! Personal fitness tracker - workouts, templates, weekly routines, plans,
//! training blocks and body metrics, kept in one in-memory store that works
//! offline and syncs per document with a hosted database once signed in.
//!
//! ## Features
//!
//! - **Single source of truth**: `FitnessStore` validates every record and
//!   broadcasts each change with its origin
//! - **Offline first**: a SQLite cache mirrors the store while signed out
//! - **Sync**: one subscription per collection, last write wins per document
//! - **Analytics**: 1RM estimates, unit conversion, volume and PR tracking
//! - **Real-time**: WebSocket change feed for live dashboards
//!
//! ## Modules
//!
//! - [`store`]: Records, validation and the store itself
//! - [`analytics`]: Pure calculations over store data
//! - [`local`]: Offline cache and mirror
//! - [`remote`]: Document store clients and the sync manager
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Change feed
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use ironlog::analytics::{personal_records, OneRepMaxFormula};
//! use ironlog::store::{Exercise, FitnessStore, PrLift, Workout};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FitnessStore::new();
//!
//!     let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
//!     let workout = store
//!         .add_workout(Workout::new("Leg Day", date).exercise(Exercise::new("Squat").set(5, 100.0)))
//!         .await?;
//!     store.toggle_workout_completion(&workout.id).await?;
//!
//!     let workouts = store.completed_workouts().await;
//!     let lifts = store.list::<PrLift>().await;
//!     for pr in personal_records(&workouts, &lifts, OneRepMaxFormula::Epley) {
//!         println!("{}: {:.1}", pr.exercise, pr.estimated_one_rep_max);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod api;
pub mod config;
pub mod local;
pub mod remote;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use store::{
    BodyMeasurement, CollectionKind, DataExport, Exercise, ExerciseSet, FitnessStore, Origin,
    StoreError, StoreEvent, StoreResult, StoreStats, TrainingBlock, WeeklyRoutine, Workout,
    WorkoutPlan, WorkoutTemplate,
};

pub use analytics::{convert, estimate_one_rep_max, LengthUnit, MassUnit, OneRepMaxFormula, Unit};

pub use local::{CacheError, LocalCache, LocalMirror};

pub use remote::{
    DocumentStore, MemoryDocumentStore, RemoteError, RemoteResult, RestDocumentStore, SyncManager,
    SyncStatus, User,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use websocket::{
    websocket_handler, ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
};

pub use config::{
    ApiConfig as ConfigApiConfig, Config, ConfigError, LoggingConfig, RemoteConfig, StorageConfig,
};
