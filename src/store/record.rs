//! Record plumbing shared by every collection
//!
//! - `Record`: what the store needs to know about an entity type
//! - `CollectionKind` / `SingletonKind`: names used locally and remotely
//! - `Collections`: the full in-memory data set (also the export payload)

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::error::ValidationError;
use crate::store::tracking::{
    BodyMeasurement, MoodLog, PrLift, ProgressPhoto, Reminder, SteroidCycle, Supplement,
    SupplementLog, UnitSettings, UserProfile, WeakPoint, WeeklyRecovery,
};
use crate::store::types::{TrainingBlock, WeeklyRoutine, Workout, WorkoutPlan, WorkoutTemplate};

/// Generate a fresh record id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Every list-shaped collection the store holds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Workouts,
    Templates,
    Routines,
    TrainingBlocks,
    Plans,
    Measurements,
    ProgressPhotos,
    Supplements,
    SteroidCycles,
    SupplementLogs,
    WeakPoints,
    PrLifts,
    Reminders,
    MoodLogs,
}

impl CollectionKind {
    pub fn all() -> &'static [CollectionKind] {
        &[
            CollectionKind::Workouts,
            CollectionKind::Templates,
            CollectionKind::Routines,
            CollectionKind::TrainingBlocks,
            CollectionKind::Plans,
            CollectionKind::Measurements,
            CollectionKind::ProgressPhotos,
            CollectionKind::Supplements,
            CollectionKind::SteroidCycles,
            CollectionKind::SupplementLogs,
            CollectionKind::WeakPoints,
            CollectionKind::PrLifts,
            CollectionKind::Reminders,
            CollectionKind::MoodLogs,
        ]
    }

    /// Collection name under `users/{uid}/` in the document store
    pub fn remote_name(&self) -> &'static str {
        match self {
            CollectionKind::Workouts => "workouts",
            CollectionKind::Templates => "workoutTemplates",
            CollectionKind::Routines => "weeklyRoutines",
            CollectionKind::TrainingBlocks => "trainingBlocks",
            CollectionKind::Plans => "workoutPlans",
            CollectionKind::Measurements => "bodyMeasurements",
            CollectionKind::ProgressPhotos => "progressPhotos",
            CollectionKind::Supplements => "supplements",
            CollectionKind::SteroidCycles => "steroidCycles",
            CollectionKind::SupplementLogs => "supplementLogs",
            CollectionKind::WeakPoints => "weakPoints",
            CollectionKind::PrLifts => "prLifts",
            CollectionKind::Reminders => "reminders",
            CollectionKind::MoodLogs => "moodLogs",
        }
    }

    /// Singular noun used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            CollectionKind::Workouts => "workout",
            CollectionKind::Templates => "template",
            CollectionKind::Routines => "routine",
            CollectionKind::TrainingBlocks => "training block",
            CollectionKind::Plans => "plan",
            CollectionKind::Measurements => "measurement",
            CollectionKind::ProgressPhotos => "progress photo",
            CollectionKind::Supplements => "supplement",
            CollectionKind::SteroidCycles => "cycle",
            CollectionKind::SupplementLogs => "supplement log",
            CollectionKind::WeakPoints => "weak point",
            CollectionKind::PrLifts => "PR lift",
            CollectionKind::Reminders => "reminder",
            CollectionKind::MoodLogs => "mood log",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CollectionKind::Workouts => "workouts",
            CollectionKind::Templates => "templates",
            CollectionKind::Routines => "routines",
            CollectionKind::TrainingBlocks => "training_blocks",
            CollectionKind::Plans => "plans",
            CollectionKind::Measurements => "measurements",
            CollectionKind::ProgressPhotos => "progress_photos",
            CollectionKind::Supplements => "supplements",
            CollectionKind::SteroidCycles => "steroid_cycles",
            CollectionKind::SupplementLogs => "supplement_logs",
            CollectionKind::WeakPoints => "weak_points",
            CollectionKind::PrLifts => "pr_lifts",
            CollectionKind::Reminders => "reminders",
            CollectionKind::MoodLogs => "mood_logs",
        };
        f.write_str(name)
    }
}

/// Documents that hold a single object rather than a list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SingletonKind {
    Profile,
    WeeklyRecovery,
    UnitSettings,
}

impl SingletonKind {
    pub fn all() -> &'static [SingletonKind] {
        &[
            SingletonKind::Profile,
            SingletonKind::WeeklyRecovery,
            SingletonKind::UnitSettings,
        ]
    }

    /// Remote collection holding the document
    pub fn remote_collection(&self) -> &'static str {
        match self {
            SingletonKind::Profile => "profile",
            SingletonKind::WeeklyRecovery => "weeklyRecoveryData",
            SingletonKind::UnitSettings => "settings",
        }
    }

    /// Remote document id
    pub fn document_id(&self) -> &'static str {
        match self {
            SingletonKind::Profile => "info",
            SingletonKind::WeeklyRecovery => "current",
            SingletonKind::UnitSettings => "units",
        }
    }
}

impl std::fmt::Display for SingletonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SingletonKind::Profile => write!(f, "profile"),
            SingletonKind::WeeklyRecovery => write!(f, "weekly_recovery"),
            SingletonKind::UnitSettings => write!(f, "unit_settings"),
        }
    }
}

/// An entity stored in one of the store's collections
pub trait Record:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: CollectionKind;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn updated_at(&self) -> i64;
    fn set_updated_at(&mut self, timestamp: i64);
    fn check(&self) -> Result<(), ValidationError>;

    fn items(collections: &Collections) -> &Vec<Self>;
    fn items_mut(collections: &mut Collections) -> &mut Vec<Self>;
}

macro_rules! impl_record {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl Record for $ty {
            const KIND: CollectionKind = CollectionKind::$kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn updated_at(&self) -> i64 {
                self.updated_at
            }

            fn set_updated_at(&mut self, timestamp: i64) {
                self.updated_at = timestamp;
            }

            fn check(&self) -> Result<(), ValidationError> {
                self.validate()
            }

            fn items(collections: &Collections) -> &Vec<Self> {
                &collections.$field
            }

            fn items_mut(collections: &mut Collections) -> &mut Vec<Self> {
                &mut collections.$field
            }
        }
    };
}

impl_record!(Workout, Workouts, workouts);
impl_record!(WorkoutTemplate, Templates, templates);
impl_record!(WeeklyRoutine, Routines, routines);
impl_record!(TrainingBlock, TrainingBlocks, training_blocks);
impl_record!(WorkoutPlan, Plans, plans);
impl_record!(BodyMeasurement, Measurements, measurements);
impl_record!(ProgressPhoto, ProgressPhotos, progress_photos);
impl_record!(Supplement, Supplements, supplements);
impl_record!(SteroidCycle, SteroidCycles, steroid_cycles);
impl_record!(SupplementLog, SupplementLogs, supplement_logs);
impl_record!(WeakPoint, WeakPoints, weak_points);
impl_record!(PrLift, PrLifts, pr_lifts);
impl_record!(Reminder, Reminders, reminders);
impl_record!(MoodLog, MoodLogs, mood_logs);

/// A single-document record (profile, recovery, unit settings)
pub trait Singleton:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: SingletonKind;

    fn updated_at(&self) -> i64;
    fn set_updated_at(&mut self, timestamp: i64);
    fn check(&self) -> Result<(), ValidationError>;
    fn of(collections: &Collections) -> &Self;
    fn slot(collections: &mut Collections) -> &mut Self;
}

macro_rules! impl_singleton {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl Singleton for $ty {
            const KIND: SingletonKind = SingletonKind::$kind;

            fn updated_at(&self) -> i64 {
                self.updated_at
            }

            fn set_updated_at(&mut self, timestamp: i64) {
                self.updated_at = timestamp;
            }

            fn check(&self) -> Result<(), ValidationError> {
                self.validate()
            }

            fn of(collections: &Collections) -> &Self {
                &collections.$field
            }

            fn slot(collections: &mut Collections) -> &mut Self {
                &mut collections.$field
            }
        }
    };
}

impl_singleton!(UserProfile, Profile, profile);
impl_singleton!(WeeklyRecovery, WeeklyRecovery, weekly_recovery);
impl_singleton!(UnitSettings, UnitSettings, unit_settings);

/// Run `$body` with `$t` bound to the record type of a runtime `CollectionKind`
macro_rules! with_record_type {
    ($kind:expr, $t:ident => $body:expr) => {{
        use $crate::store::record::CollectionKind as __Kind;
        match $kind {
            __Kind::Workouts => {
                type $t = $crate::store::types::Workout;
                $body
            }
            __Kind::Templates => {
                type $t = $crate::store::types::WorkoutTemplate;
                $body
            }
            __Kind::Routines => {
                type $t = $crate::store::types::WeeklyRoutine;
                $body
            }
            __Kind::TrainingBlocks => {
                type $t = $crate::store::types::TrainingBlock;
                $body
            }
            __Kind::Plans => {
                type $t = $crate::store::types::WorkoutPlan;
                $body
            }
            __Kind::Measurements => {
                type $t = $crate::store::tracking::BodyMeasurement;
                $body
            }
            __Kind::ProgressPhotos => {
                type $t = $crate::store::tracking::ProgressPhoto;
                $body
            }
            __Kind::Supplements => {
                type $t = $crate::store::tracking::Supplement;
                $body
            }
            __Kind::SteroidCycles => {
                type $t = $crate::store::tracking::SteroidCycle;
                $body
            }
            __Kind::SupplementLogs => {
                type $t = $crate::store::tracking::SupplementLog;
                $body
            }
            __Kind::WeakPoints => {
                type $t = $crate::store::tracking::WeakPoint;
                $body
            }
            __Kind::PrLifts => {
                type $t = $crate::store::tracking::PrLift;
                $body
            }
            __Kind::Reminders => {
                type $t = $crate::store::tracking::Reminder;
                $body
            }
            __Kind::MoodLogs => {
                type $t = $crate::store::tracking::MoodLog;
                $body
            }
        }
    }};
}

pub(crate) use with_record_type;

/// The complete in-memory data set
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Collections {
    #[serde(default)]
    pub workouts: Vec<Workout>,
    #[serde(default)]
    pub templates: Vec<WorkoutTemplate>,
    #[serde(default)]
    pub routines: Vec<WeeklyRoutine>,
    #[serde(default)]
    pub training_blocks: Vec<TrainingBlock>,
    #[serde(default)]
    pub plans: Vec<WorkoutPlan>,
    #[serde(default)]
    pub measurements: Vec<BodyMeasurement>,
    #[serde(default)]
    pub progress_photos: Vec<ProgressPhoto>,
    #[serde(default)]
    pub supplements: Vec<Supplement>,
    #[serde(default)]
    pub steroid_cycles: Vec<SteroidCycle>,
    #[serde(default)]
    pub supplement_logs: Vec<SupplementLog>,
    #[serde(default)]
    pub weak_points: Vec<WeakPoint>,
    #[serde(default)]
    pub pr_lifts: Vec<PrLift>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub mood_logs: Vec<MoodLog>,
    #[serde(default)]
    pub favorite_exercises: Vec<String>,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub weekly_recovery: WeeklyRecovery,
    #[serde(default)]
    pub unit_settings: UnitSettings,
}

impl Collections {
    /// Number of records in one collection
    pub fn count(&self, kind: CollectionKind) -> usize {
        with_record_type!(kind, T => T::items(self).len())
    }

    /// Number of records across every list collection
    pub fn total_records(&self) -> usize {
        CollectionKind::all().iter().map(|&k| self.count(k)).sum()
    }
}
