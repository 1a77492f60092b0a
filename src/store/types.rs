//! Core training types
//!
//! This module defines the records the training screens work with:
//! - `Workout`, `Exercise`, `ExerciseSet`: a logged or in-progress session
//! - `WorkoutTemplate`: a reusable blueprint copied into workouts
//! - `WeeklyRoutine`, `TrainingBlock`, `WorkoutPlan`: scheduling

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::error::{require_name, require_non_negative, ValidationError};
use crate::store::record::new_id;

/// A single set within an exercise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSet {
    pub reps: u32,
    pub weight: f64,
    #[serde(default)]
    pub completed: bool,
}

impl ExerciseSet {
    pub fn new(reps: u32, weight: f64) -> Self {
        Self {
            reps,
            weight,
            completed: false,
        }
    }
}

/// Lift category used to group personal records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PrCategory {
    Squat,
    Bench,
    Deadlift,
    OverheadPress,
    Other,
}

impl std::fmt::Display for PrCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrCategory::Squat => write!(f, "squat"),
            PrCategory::Bench => write!(f, "bench"),
            PrCategory::Deadlift => write!(f, "deadlift"),
            PrCategory::OverheadPress => write!(f, "overhead_press"),
            PrCategory::Other => write!(f, "other"),
        }
    }
}

/// An exercise embedded in a workout or template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
    #[serde(default)]
    pub rest_seconds: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub weak_point: bool,
    #[serde(default)]
    pub pr_category: Option<PrCategory>,
}

impl Exercise {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            sets: Vec::new(),
            rest_seconds: None,
            notes: None,
            weak_point: false,
            pr_category: None,
        }
    }

    /// Builder: append a set
    pub fn set(mut self, reps: u32, weight: f64) -> Self {
        self.sets.push(ExerciseSet::new(reps, weight));
        self
    }

    /// Builder: set rest time between sets
    pub fn rest(mut self, seconds: u32) -> Self {
        self.rest_seconds = Some(seconds);
        self
    }

    /// Builder: tag with a PR category
    pub fn category(mut self, category: PrCategory) -> Self {
        self.pr_category = Some(category);
        self
    }

    /// Builder: flag as a weak-point exercise
    pub fn weak_point(mut self) -> Self {
        self.weak_point = true;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("exercise.name", &self.name)?;
        for set in &self.sets {
            require_non_negative("exercise.sets.weight", Some(set.weight))?;
        }
        Ok(())
    }

    /// Copy with a fresh id and all sets marked not completed
    fn fresh_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.id = new_id();
        for set in &mut copy.sets {
            set.completed = false;
        }
        copy
    }
}

/// A workout session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub completed: bool,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub scheduled_time: Option<NaiveTime>,
    /// Unix ms when the session was started
    #[serde(default)]
    pub started_at: Option<i64>,
    /// Unix ms when the session was marked complete
    #[serde(default)]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

impl Workout {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            exercises: Vec::new(),
            completed: false,
            date,
            notes: None,
            scheduled_time: None,
            started_at: None,
            completed_at: None,
            template_id: None,
            updated_at: 0,
        }
    }

    /// Builder: append an exercise
    pub fn exercise(mut self, exercise: Exercise) -> Self {
        self.exercises.push(exercise);
        self
    }

    /// Builder: set notes
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builder: schedule for a time of day
    pub fn scheduled_at(mut self, time: NaiveTime) -> Self {
        self.scheduled_time = Some(time);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        for exercise in &self.exercises {
            exercise.validate()?;
        }
        Ok(())
    }

    /// Total number of sets across all exercises
    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// A reusable workout blueprint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTemplate {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl WorkoutTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: None,
            exercises: Vec::new(),
            favorite: false,
            updated_at: 0,
        }
    }

    /// Builder: append an exercise
    pub fn exercise(mut self, exercise: Exercise) -> Self {
        self.exercises.push(exercise);
        self
    }

    /// Builder: set description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        for exercise in &self.exercises {
            exercise.validate()?;
        }
        Ok(())
    }

    /// Copy this template into a new, not-yet-stored workout
    pub fn instantiate(&self, date: NaiveDate) -> Workout {
        let mut workout = Workout::new(self.name.clone(), date);
        workout.exercises = self.exercises.iter().map(Exercise::fresh_copy).collect();
        workout.template_id = Some(self.id.clone());
        workout
    }
}

/// Day of the week used as a routine key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn all() -> &'static [DayOfWeek] {
        &[
            DayOfWeek::Monday,
            DayOfWeek::Tuesday,
            DayOfWeek::Wednesday,
            DayOfWeek::Thursday,
            DayOfWeek::Friday,
            DayOfWeek::Saturday,
            DayOfWeek::Sunday,
        ]
    }

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<chrono::Weekday> for DayOfWeek {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => DayOfWeek::Monday,
            chrono::Weekday::Tue => DayOfWeek::Tuesday,
            chrono::Weekday::Wed => DayOfWeek::Wednesday,
            chrono::Weekday::Thu => DayOfWeek::Thursday,
            chrono::Weekday::Fri => DayOfWeek::Friday,
            chrono::Weekday::Sat => DayOfWeek::Saturday,
            chrono::Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Mapping of weekdays to templates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyRoutine {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Template id per scheduled day. References are not checked; a
    /// deleted template leaves a dangling id here.
    #[serde(default)]
    pub days: BTreeMap<DayOfWeek, String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl WeeklyRoutine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            days: BTreeMap::new(),
            archived: false,
            updated_at: 0,
        }
    }

    /// Builder: schedule a template on a day
    pub fn day(mut self, day: DayOfWeek, template_id: impl Into<String>) -> Self {
        self.days.insert(day, template_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        if self.days.values().any(|t| t.trim().is_empty()) {
            return Err(ValidationError::new("days", "template id must not be empty"));
        }
        Ok(())
    }

    pub fn template_for(&self, day: DayOfWeek) -> Option<&str> {
        self.days.get(&day).map(String::as_str)
    }
}

/// A dated period of training on one routine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingBlock {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub duration_weeks: u32,
    #[serde(default)]
    pub routine_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: i64,
}

/// Longest training block accepted, ten years
pub const MAX_BLOCK_WEEKS: u32 = 520;

impl TrainingBlock {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, duration_weeks: u32) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            start_date,
            duration_weeks,
            routine_id: None,
            notes: None,
            updated_at: 0,
        }
    }

    /// Builder: attach a routine
    pub fn routine(mut self, routine_id: impl Into<String>) -> Self {
        self.routine_id = Some(routine_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)?;
        if self.duration_weeks == 0 {
            return Err(ValidationError::new("duration_weeks", "must be at least 1"));
        }
        if self.duration_weeks > MAX_BLOCK_WEEKS {
            return Err(ValidationError::new(
                "duration_weeks",
                format!("must be at most {}", MAX_BLOCK_WEEKS),
            ));
        }
        Ok(())
    }

    /// First day after the block (exclusive end)
    ///
    /// Saturates at `NaiveDate::MAX` for blocks that run past the calendar.
    pub fn end_date(&self) -> NaiveDate {
        self.start_date
            .checked_add_signed(Duration::weeks(i64::from(self.duration_weeks)))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date()
    }

    /// 1-based week number of `date` inside the block
    pub fn week_of(&self, date: NaiveDate) -> Option<u32> {
        if !self.contains(date) {
            return None;
        }
        Some(((date - self.start_date).num_days() / 7) as u32 + 1)
    }
}

/// A named collection of templates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutPlan {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub template_ids: Vec<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub updated_at: i64,
}

impl WorkoutPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: None,
            template_ids: Vec::new(),
            active: false,
            updated_at: 0,
        }
    }

    /// Builder: add a template
    pub fn template(mut self, template_id: impl Into<String>) -> Self {
        self.template_ids.push(template_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_name("name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_workout_builder_and_validation() {
        let workout = Workout::new("Leg Day", date(2024, 3, 4))
            .exercise(Exercise::new("Squat").set(5, 100.0).category(PrCategory::Squat));

        assert_eq!(workout.set_count(), 1);
        assert!(workout.validate().is_ok());

        let blank = Workout::new("  ", date(2024, 3, 4));
        assert!(blank.validate().is_err());

        let negative = Workout::new("Push", date(2024, 3, 4))
            .exercise(Exercise::new("Bench").set(5, -20.0));
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_template_instantiate() {
        let mut template = WorkoutTemplate::new("Upper")
            .exercise(Exercise::new("Bench").set(5, 80.0).set(5, 80.0));
        template.id = "tpl-1".to_string();
        template.exercises[0].sets[0].completed = true;

        let workout = template.instantiate(date(2024, 3, 5));
        assert_eq!(workout.name, "Upper");
        assert_eq!(workout.template_id.as_deref(), Some("tpl-1"));
        assert_eq!(workout.set_count(), 2);
        assert!(workout.exercises[0].sets.iter().all(|s| !s.completed));
        assert_ne!(workout.exercises[0].id, template.exercises[0].id);
        assert!(!workout.completed);
    }

    #[test]
    fn test_day_of_week() {
        // 2024-03-04 is a Monday
        assert_eq!(DayOfWeek::of(date(2024, 3, 4)), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::of(date(2024, 3, 10)), DayOfWeek::Sunday);
    }

    #[test]
    fn test_routine_serialization() {
        let routine = WeeklyRoutine::new("PPL")
            .day(DayOfWeek::Monday, "push")
            .day(DayOfWeek::Wednesday, "pull");

        let json = serde_json::to_string(&routine).unwrap();
        assert!(json.contains("\"monday\":\"push\""));

        let restored: WeeklyRoutine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, routine);
        assert_eq!(restored.template_for(DayOfWeek::Wednesday), Some("pull"));
        assert_eq!(restored.template_for(DayOfWeek::Friday), None);
    }

    #[test]
    fn test_training_block_weeks() {
        let block = TrainingBlock::new("Hypertrophy", date(2024, 1, 1), 4);
        assert!(block.validate().is_ok());
        assert_eq!(block.end_date(), date(2024, 1, 29));
        assert_eq!(block.week_of(date(2024, 1, 1)), Some(1));
        assert_eq!(block.week_of(date(2024, 1, 8)), Some(2));
        assert_eq!(block.week_of(date(2024, 1, 28)), Some(4));
        assert_eq!(block.week_of(date(2024, 1, 29)), None);

        let empty = TrainingBlock::new("Nothing", date(2024, 1, 1), 0);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_training_block_duration_bounds() {
        let start = date(2024, 1, 1);
        assert!(TrainingBlock::new("Decade", start, MAX_BLOCK_WEEKS).validate().is_ok());
        assert!(TrainingBlock::new("Too long", start, MAX_BLOCK_WEEKS + 1).validate().is_err());

        // Unvalidated records still answer date queries without overflowing
        let huge = TrainingBlock::new("Forever", start, u32::MAX);
        assert!(huge.validate().is_err());
        assert_eq!(huge.end_date(), NaiveDate::MAX);
        assert!(huge.contains(start));
        assert_eq!(huge.week_of(date(2024, 1, 8)), Some(2));

        let late = TrainingBlock::new("Late", NaiveDate::MAX, 1);
        assert_eq!(late.end_date(), NaiveDate::MAX);
        assert!(!late.contains(NaiveDate::MAX));
    }
}
