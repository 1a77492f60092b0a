//! Data Transfer Objects
//!
//! Request and response types for the API endpoints. Records themselves
//! travel as their store types; these cover queries and composite views.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analytics::{MeasurementPoint, PersonalRecord, ProgressPoint, WeeklyVolume};
use crate::remote::{SyncStatus, User};
use crate::store::{PrCategory, Reminder, ScheduledWorkout, StoreStats, TrainingBlock, UnitSettings};

// ============================================
// COMMON
// ============================================

/// Any collection listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

// ============================================
// WORKOUT DTOs
// ============================================

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutStatus {
    Active,
    Completed,
    #[default]
    All,
}

#[derive(Debug, Deserialize, Default)]
pub struct WorkoutListQuery {
    #[serde(default)]
    pub status: WorkoutStatus,
}

/// Body for starting a session from a template
#[derive(Debug, Deserialize, Default)]
pub struct StartWorkoutRequest {
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DateQuery {
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

// ============================================
// DASHBOARD DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub date: NaiveDate,
    pub todays_workout: Option<ScheduledWorkout>,
    pub active_workouts: usize,
    pub completed_workouts: usize,
    pub due_reminders: Vec<Reminder>,
    /// Top estimated 1RMs, best first
    pub recent_prs: Vec<PersonalRecord>,
    pub weekly_volume: Vec<WeeklyVolume>,
    pub training_block: Option<TrainingBlock>,
    /// Week of the current block, starting at 1
    pub block_week: Option<u32>,
    pub deload_mode: bool,
    /// 0-100 from the weekly recovery check-in
    pub readiness_score: Option<f64>,
    pub units: UnitSettings,
}

// ============================================
// SETTINGS DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct DeloadRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteResponse {
    pub name: String,
    pub favorite: bool,
    pub favorites: Vec<String>,
}

// ============================================
// ANALYTICS DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct OneRepMaxQuery {
    pub weight: f64,
    pub reps: i64,
    #[serde(default)]
    pub formula: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OneRepMaxResponse {
    pub weight: f64,
    pub reps: i64,
    pub formula: String,
    pub estimate: f64,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub value: f64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub value: f64,
    pub from: String,
    pub to: String,
    pub result: f64,
}

#[derive(Debug, Deserialize)]
pub struct VolumeQuery {
    #[serde(default = "default_weeks")]
    pub weeks: usize,
}

fn default_weeks() -> usize {
    8
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    pub weekly: Vec<WeeklyVolume>,
    pub by_category: BTreeMap<PrCategory, f64>,
    pub total: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct FormulaQuery {
    #[serde(default)]
    pub formula: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub exercise: String,
    #[serde(default)]
    pub formula: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub exercise: String,
    pub points: Vec<ProgressPoint>,
}

#[derive(Debug, Deserialize)]
pub struct MeasurementQuery {
    /// weight, waist, body_fat, ...
    pub field: String,
}

#[derive(Debug, Serialize)]
pub struct MeasurementSeriesResponse {
    pub field: String,
    pub points: Vec<MeasurementPoint>,
}

// ============================================
// EXPORT DTOs
// ============================================

#[derive(Debug, Deserialize, Default)]
pub struct ExportQuery {
    /// json (default) or csv
    #[serde(default)]
    pub format: Option<String>,
    /// CSV only: workouts (default) or measurements
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub status: String,
    pub records: usize,
}

// ============================================
// SESSION DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<User>,
    pub sync: SyncStatus,
}

// ============================================
// HEALTH DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: StoreStats,
    pub cache: String,
    pub signed_in: bool,
    pub websocket_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
