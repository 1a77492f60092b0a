//! Tracking records
//!
//! Body measurements, progress photos, supplements and cycles, reminders,
//! mood and the singleton documents (profile, weekly recovery, units).

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::analytics::units::{LengthUnit, MassUnit};
use crate::store::error::{require_name, require_non_negative, require_rating, ValidationError};
use crate::store::types::PrCategory;

/// Date-stamped body measurements; every field is optional
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodyMeasurement {
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub body_fat: Option<f64>,
    #[serde(default)]
    pub neck: Option<f64>,
    #[serde(default)]
    pub chest: Option<f64>,
    #[serde(default)]
    pub waist: Option<f64>,
    #[serde(default)]
    pub hips: Option<f64>,
    #[serde(default)]
    pub arms: Option<f64>,
    #[serde(default)]
    pub thighs: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl BodyMeasurement {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: String::new(),
            date,
            weight: None,
            body_fat: None,
            neck: None,
            chest: None,
            waist: None,
            hips: None,
            arms: None,
            thighs: None,
            notes: None,
            updated_at: 0,
        }
    }

    /// Builder: set body weight
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Builder: set waist circumference
    pub fn waist(mut self, waist: f64) -> Self {
        self.waist = Some(waist);
        self
    }

    /// Builder: set body fat percentage
    pub fn body_fat(mut self, percent: f64) -> Self {
        self.body_fat = Some(percent);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("weight", self.weight)?;
        require_non_negative("neck", self.neck)?;
        require_non_negative("chest", self.chest)?;
        require_non_negative("waist", self.waist)?;
        require_non_negative("hips", self.hips)?;
        require_non_negative("arms", self.arms)?;
        require_non_negative("thighs", self.thighs)?;
        require_non_negative("body_fat", self.body_fat)?;
        if self.body_fat.is_some_and(|bf| bf > 100.0) {
            return Err(ValidationError::new("body_fat", "must be a percentage"));
        }
        Ok(())
    }

    /// Look up a field by name, for charting
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "weight" => self.weight,
            "body_fat" => self.body_fat,
            "neck" => self.neck,
            "chest" => self.chest,
            "waist" => self.waist,
            "hips" => self.hips,
            "arms" => self.arms,
            "thighs" => self.thighs,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressPhoto {
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    pub image_url: String,
    #[serde(default)]
    pub pose: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl ProgressPhoto {
    pub fn new(date: NaiveDate, image_url: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            date,
            image_url: image_url.into(),
            pose: None,
            notes: None,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.image_url.trim().is_empty() {
            return Err(ValidationError::new("image_url", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supplement {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

impl Supplement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            dosage: None,
            unit: None,
            frequency: None,
            time_of_day: None,
            active: true,
            updated_at: 0,
        }
    }

    /// Builder: set dose and unit
    pub fn dose(mut self, dosage: f64, unit: impl Into<String>) -> Self {
        self.dosage = Some(dosage);
        self.unit = Some(unit.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        require_non_negative("dosage", self.dosage)
    }
}

/// One compound inside a cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SteroidCompound {
    pub name: String,
    /// Weekly dose in milligrams
    pub weekly_dosage_mg: f64,
    #[serde(default)]
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SteroidCycle {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub compounds: Vec<SteroidCompound>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl SteroidCycle {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ValidationError::new("end_date", "must not precede start_date"));
            }
        }
        for compound in &self.compounds {
            require_name("compounds.name", &compound.name)?;
            require_non_negative("compounds.weekly_dosage_mg", Some(compound.weekly_dosage_mg))?;
        }
        Ok(())
    }
}

/// A record of taking a supplement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplementLog {
    #[serde(default)]
    pub id: String,
    pub supplement_id: String,
    /// Unix ms
    pub taken_at: i64,
    #[serde(default)]
    pub dosage: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl SupplementLog {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.supplement_id.trim().is_empty() {
            return Err(ValidationError::new("supplement_id", "must not be empty"));
        }
        require_non_negative("dosage", self.dosage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeakPoint {
    #[serde(default)]
    pub id: String,
    pub muscle_group: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 1 (highest) to 5
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_priority() -> u8 {
    3
}

impl WeakPoint {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("muscle_group", &self.muscle_group)?;
        if !(1..=5).contains(&self.priority) {
            return Err(ValidationError::new("priority", "must be between 1 and 5"));
        }
        Ok(())
    }
}

/// A manually recorded personal-record lift
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrLift {
    #[serde(default)]
    pub id: String,
    pub exercise: String,
    #[serde(default)]
    pub category: Option<PrCategory>,
    pub weight: f64,
    pub reps: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub updated_at: i64,
}

impl PrLift {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("exercise", &self.exercise)?;
        require_non_negative("weight", Some(self.weight))?;
        if self.reps == 0 {
            return Err(ValidationError::new("reps", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReminderRepeat {
    #[default]
    None,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Unix ms
    pub due_at: i64,
    #[serde(default)]
    pub repeat: ReminderRepeat,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl Reminder {
    pub fn new(title: impl Into<String>, due_at: i64) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            message: None,
            due_at,
            repeat: ReminderRepeat::None,
            completed: false,
            updated_at: 0,
        }
    }

    /// Builder: set repeat interval
    pub fn repeat(mut self, repeat: ReminderRepeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("title", &self.title)
    }

    pub fn is_due(&self, now: i64) -> bool {
        !self.completed && self.due_at <= now
    }

    /// Mark done; repeating reminders move to their next due time instead
    pub fn complete(&mut self, now: i64) {
        let step = match self.repeat {
            ReminderRepeat::None => {
                self.completed = true;
                return;
            }
            ReminderRepeat::Daily => Duration::days(1).num_milliseconds(),
            ReminderRepeat::Weekly => Duration::weeks(1).num_milliseconds(),
        };
        if self.due_at > now {
            return;
        }
        // First occurrence strictly after `now`, saturating at the far future
        let step = i128::from(step);
        let missed = (i128::from(now) - i128::from(self.due_at)) / step + 1;
        let next = i128::from(self.due_at) + missed * step;
        self.due_at = i64::try_from(next).unwrap_or(i64::MAX);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoodLog {
    #[serde(default)]
    pub id: String,
    /// Unix ms
    pub timestamp: i64,
    /// 1-10
    pub mood: u8,
    #[serde(default)]
    pub energy: Option<u8>,
    #[serde(default)]
    pub stress: Option<u8>,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl MoodLog {
    pub fn new(timestamp: i64, mood: u8) -> Self {
        Self {
            id: String::new(),
            timestamp,
            mood,
            energy: None,
            stress: None,
            sleep_hours: None,
            notes: None,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_rating("mood", Some(self.mood))?;
        require_rating("energy", self.energy)?;
        require_rating("stress", self.stress)?;
        require_non_negative("sleep_hours", self.sleep_hours)?;
        if self.sleep_hours.is_some_and(|h| h > 24.0) {
            return Err(ValidationError::new("sleep_hours", "must not exceed 24"));
        }
        Ok(())
    }
}

/// Singleton user profile (`profile/info`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub goal: Option<String>,
    /// Reduce suggested intensity; recorded only, no training logic keys off it
    #[serde(default)]
    pub deload_mode: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("height_cm", self.height_cm)
    }
}

/// Singleton weekly recovery check-in (`weeklyRecoveryData/current`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WeeklyRecovery {
    #[serde(default)]
    pub week_start: Option<NaiveDate>,
    #[serde(default)]
    pub sleep_quality: Option<u8>,
    #[serde(default)]
    pub soreness: Option<u8>,
    #[serde(default)]
    pub stress: Option<u8>,
    #[serde(default)]
    pub energy: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl WeeklyRecovery {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_rating("sleep_quality", self.sleep_quality)?;
        require_rating("soreness", self.soreness)?;
        require_rating("stress", self.stress)?;
        require_rating("energy", self.energy)
    }

    /// Readiness on a 0-100 scale; soreness and stress count inversely
    pub fn readiness_score(&self) -> Option<f64> {
        let scores: Vec<f64> = [
            self.sleep_quality.map(f64::from),
            self.energy.map(f64::from),
            self.soreness.map(|v| 11.0 - f64::from(v)),
            self.stress.map(|v| 11.0 - f64::from(v)),
        ]
        .into_iter()
        .flatten()
        .collect();

        if scores.is_empty() {
            return None;
        }
        let avg = scores.iter().sum::<f64>() / scores.len() as f64;
        Some(((avg - 1.0) / 9.0 * 100.0).clamp(0.0, 100.0))
    }
}

/// Singleton unit preferences (`settings/units`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UnitSettings {
    #[serde(default)]
    pub mass: MassUnit,
    #[serde(default)]
    pub length: LengthUnit,
    #[serde(default)]
    pub updated_at: i64,
}

impl UnitSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}
