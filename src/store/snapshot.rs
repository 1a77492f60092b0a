//! Export and import
//!
//! A full JSON export wraps every collection with a version and timestamp
//! so it can be re-imported. CSV export flattens workouts (one row per set)
//! and body measurements for spreadsheets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::store::container::FitnessStore;
use crate::store::error::{StoreError, StoreResult};
use crate::store::events::Origin;
use crate::store::record::Collections;
use crate::store::tracking::BodyMeasurement;
use crate::store::types::Workout;

/// Current export format version
pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(StoreError::Export(format!(
                "Unsupported format: {}. Use json or csv",
                other
            ))),
        }
    }
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// A versioned dump of the whole store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub data: Collections,
}

impl DataExport {
    pub fn new(data: Collections) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            data,
        }
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        let export: DataExport = serde_json::from_str(json)?;
        if export.version > EXPORT_VERSION {
            return Err(StoreError::Export(format!(
                "Export version {} is newer than supported version {}",
                export.version, EXPORT_VERSION
            )));
        }
        Ok(export)
    }
}

#[derive(Serialize)]
struct SetRow<'a> {
    date: String,
    workout: &'a str,
    completed: bool,
    exercise: &'a str,
    set: usize,
    reps: u32,
    weight: f64,
    set_completed: bool,
}

/// One row per set, workouts in the order given
pub fn workouts_to_csv(workouts: &[Workout]) -> StoreResult<String> {
    let mut writer = headerless_writer();
    writer.write_record([
        "date",
        "workout",
        "completed",
        "exercise",
        "set",
        "reps",
        "weight",
        "set_completed",
    ])?;

    for workout in workouts {
        for exercise in &workout.exercises {
            for (index, set) in exercise.sets.iter().enumerate() {
                writer.serialize(SetRow {
                    date: workout.date.to_string(),
                    workout: &workout.name,
                    completed: workout.completed,
                    exercise: &exercise.name,
                    set: index + 1,
                    reps: set.reps,
                    weight: set.weight,
                    set_completed: set.completed,
                })?;
            }
        }
    }
    finish(writer)
}

#[derive(Serialize)]
struct MeasurementRow {
    date: String,
    weight: Option<f64>,
    body_fat: Option<f64>,
    neck: Option<f64>,
    chest: Option<f64>,
    waist: Option<f64>,
    hips: Option<f64>,
    arms: Option<f64>,
    thighs: Option<f64>,
}

pub fn measurements_to_csv(measurements: &[BodyMeasurement]) -> StoreResult<String> {
    let mut writer = headerless_writer();
    writer.write_record([
        "date", "weight", "body_fat", "neck", "chest", "waist", "hips", "arms", "thighs",
    ])?;
    for m in measurements {
        writer.serialize(MeasurementRow {
            date: m.date.to_string(),
            weight: m.weight,
            body_fat: m.body_fat,
            neck: m.neck,
            chest: m.chest,
            waist: m.waist,
            hips: m.hips,
            arms: m.arms,
            thighs: m.thighs,
        })?;
    }
    finish(writer)
}

/// Headers are written by hand so empty exports still carry them
fn headerless_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> StoreResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Export(e.to_string()))
}

impl FitnessStore {
    /// Snapshot the store into an export
    pub async fn export(&self) -> DataExport {
        DataExport::new(self.snapshot().await)
    }

    /// Replace the store contents with an export
    ///
    /// The import counts as a local edit, so a signed-in session pushes it.
    pub async fn import(&self, export: DataExport) -> StoreResult<usize> {
        let records = export.data.total_records();
        self.restore(export.data, Origin::Local).await?;
        tracing::info!(records, version = export.version, "Imported data export");
        Ok(records)
    }
}
