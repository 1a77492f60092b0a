//! IronLog State Store
//!
//! The in-memory source of truth for every screen:
//!
//! - **types**: Training records (workouts, templates, routines, plans, blocks)
//! - **tracking**: Measurements, photos, supplements, reminders, singletons
//! - **record**: The `Record` trait and collection naming
//! - **container**: `FitnessStore` with all read/write operations
//! - **events**: Change notifications with local/remote origin
//! - **pending**: Local writes not yet confirmed by the remote store
//! - **snapshot**: JSON/CSV export and import
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use ironlog::store::{Exercise, FitnessStore, Workout};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FitnessStore::new();
//!
//!     let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
//!     let workout = store
//!         .add_workout(Workout::new("Leg Day", date).exercise(Exercise::new("Squat").set(5, 100.0)))
//!         .await?;
//!
//!     store.toggle_workout_completion(&workout.id).await?;
//!     assert_eq!(store.completed_workouts().await.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod container;
pub mod error;
pub mod events;
pub mod pending;
pub mod record;
pub mod snapshot;
pub mod tracking;
pub mod types;

pub use container::{merge_by_timestamp, FitnessStore, ScheduledWorkout, StoreStats};
pub use error::{StoreError, StoreResult, ValidationError};
pub use events::{Change, EventTarget, Origin, StoreEvent};
pub use pending::PendingWrites;
pub use record::{new_id, now_millis, CollectionKind, Collections, Record, Singleton, SingletonKind};
pub use snapshot::{measurements_to_csv, workouts_to_csv, DataExport, ExportFormat, EXPORT_VERSION};
pub use tracking::{
    BodyMeasurement, MoodLog, PrLift, ProgressPhoto, Reminder, ReminderRepeat, SteroidCompound,
    SteroidCycle, Supplement, SupplementLog, UnitSettings, UserProfile, WeakPoint, WeeklyRecovery,
};
pub use types::{
    DayOfWeek, Exercise, ExerciseSet, PrCategory, TrainingBlock, WeeklyRoutine, Workout,
    WorkoutPlan, WorkoutTemplate,
};
