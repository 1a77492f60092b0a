//! Derived data for charts and calculators
//!
//! Pure functions with no state:
//!
//! - **one_rep_max**: Epley/Brzycki estimates
//! - **units**: kg/lbs and cm/in conversion
//! - **aggregation**: volume, weekly and per-category totals, PRs, progress

pub mod aggregation;
pub mod one_rep_max;
pub mod units;

pub use aggregation::{
    elapsed_seconds, exercise_progress, exercise_volume, format_elapsed, measurement_series,
    personal_records, recent_weekly_volume, set_volume, volume_by_category, week_start,
    weekly_volume, workout_volume, MeasurementPoint, PersonalRecord, ProgressPoint, WeeklyVolume,
};
pub use one_rep_max::{estimate_one_rep_max, OneRepMaxFormula};
pub use units::{convert, LengthUnit, MassUnit, Unit, CM_PER_INCH, LBS_PER_KG};
