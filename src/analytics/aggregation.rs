//! Chart aggregations
//!
//! Pure functions over store records. Volume is `reps * weight` summed over
//! sets. History views (weekly volume, PRs, progress) only count work that
//! was done: sets marked completed or belonging to a completed workout.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::analytics::one_rep_max::OneRepMaxFormula;
use crate::store::{BodyMeasurement, Exercise, ExerciseSet, PrCategory, PrLift, Workout};

pub fn set_volume(set: &ExerciseSet) -> f64 {
    f64::from(set.reps) * set.weight
}

pub fn exercise_volume(exercise: &Exercise) -> f64 {
    exercise.sets.iter().map(set_volume).sum()
}

pub fn workout_volume(workout: &Workout) -> f64 {
    workout.exercises.iter().map(exercise_volume).sum()
}

fn counts(workout: &Workout, set: &ExerciseSet) -> bool {
    workout.completed || set.completed
}

/// Volume of the work actually done in a workout
fn done_volume(workout: &Workout) -> f64 {
    workout
        .exercises
        .iter()
        .flat_map(|e| e.sets.iter())
        .filter(|s| counts(workout, s))
        .map(set_volume)
        .sum()
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeeklyVolume {
    pub week_start: NaiveDate,
    pub iso_year: i32,
    pub iso_week: u32,
    pub volume: f64,
    pub workouts: usize,
}

impl WeeklyVolume {
    fn empty(week_start: NaiveDate) -> Self {
        let iso = week_start.iso_week();
        Self {
            week_start,
            iso_year: iso.year(),
            iso_week: iso.week(),
            volume: 0.0,
            workouts: 0,
        }
    }
}

/// Volume per ISO week for weeks with any training, oldest first
pub fn weekly_volume(workouts: &[Workout]) -> Vec<WeeklyVolume> {
    let mut weeks: BTreeMap<NaiveDate, WeeklyVolume> = BTreeMap::new();
    for workout in workouts {
        let volume = done_volume(workout);
        if volume == 0.0 && !workout.completed {
            continue;
        }
        let start = week_start(workout.date);
        let entry = weeks
            .entry(start)
            .or_insert_with(|| WeeklyVolume::empty(start));
        entry.volume += volume;
        entry.workouts += 1;
    }
    weeks.into_values().collect()
}

/// The last `weeks` weeks ending with the week of `today`, zero-filled
pub fn recent_weekly_volume(workouts: &[Workout], today: NaiveDate, weeks: usize) -> Vec<WeeklyVolume> {
    let current = week_start(today);
    let mut series: Vec<WeeklyVolume> = (0..weeks)
        .rev()
        .map(|back| WeeklyVolume::empty(current - Duration::weeks(back as i64)))
        .collect();

    for week in weekly_volume(workouts) {
        if let Some(slot) = series.iter_mut().find(|s| s.week_start == week.week_start) {
            *slot = week;
        }
    }
    series
}

/// Completed volume per PR category; untagged exercises count as `Other`
pub fn volume_by_category(workouts: &[Workout]) -> BTreeMap<PrCategory, f64> {
    let mut totals = BTreeMap::new();
    for workout in workouts {
        for exercise in &workout.exercises {
            let volume: f64 = exercise
                .sets
                .iter()
                .filter(|s| counts(workout, s))
                .map(set_volume)
                .sum();
            if volume > 0.0 {
                *totals
                    .entry(exercise.pr_category.unwrap_or(PrCategory::Other))
                    .or_insert(0.0) += volume;
            }
        }
    }
    totals
}

/// Best lift for one exercise
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PersonalRecord {
    pub exercise: String,
    pub category: Option<PrCategory>,
    pub weight: f64,
    pub reps: u32,
    pub estimated_one_rep_max: f64,
    pub date: NaiveDate,
}

/// Best estimated 1RM per exercise across workouts and manual PR lifts
///
/// Exercise names match case-insensitively. Sorted by estimate, best first.
pub fn personal_records(
    workouts: &[Workout],
    lifts: &[PrLift],
    formula: OneRepMaxFormula,
) -> Vec<PersonalRecord> {
    let mut best: HashMap<String, PersonalRecord> = HashMap::new();
    let mut consider = |candidate: PersonalRecord| {
        if candidate.estimated_one_rep_max <= 0.0 {
            return;
        }
        let key = candidate.exercise.trim().to_lowercase();
        match best.get(&key) {
            Some(current) if current.estimated_one_rep_max >= candidate.estimated_one_rep_max => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    };

    for workout in workouts {
        for exercise in &workout.exercises {
            for set in exercise.sets.iter().filter(|s| counts(workout, s)) {
                consider(PersonalRecord {
                    exercise: exercise.name.clone(),
                    category: exercise.pr_category,
                    weight: set.weight,
                    reps: set.reps,
                    estimated_one_rep_max: formula.estimate(set.weight, i64::from(set.reps)),
                    date: workout.date,
                });
            }
        }
    }
    for lift in lifts {
        consider(PersonalRecord {
            exercise: lift.exercise.clone(),
            category: lift.category,
            weight: lift.weight,
            reps: lift.reps,
            estimated_one_rep_max: formula.estimate(lift.weight, i64::from(lift.reps)),
            date: lift.date,
        });
    }

    let mut records: Vec<PersonalRecord> = best.into_values().collect();
    records.sort_by(|a, b| {
        b.estimated_one_rep_max
            .total_cmp(&a.estimated_one_rep_max)
            .then_with(|| a.exercise.cmp(&b.exercise))
    });
    records
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub best_one_rep_max: f64,
    pub volume: f64,
}

/// Per-day best estimated 1RM and volume for one exercise, oldest first
pub fn exercise_progress(
    workouts: &[Workout],
    exercise: &str,
    formula: OneRepMaxFormula,
) -> Vec<ProgressPoint> {
    let wanted = exercise.trim().to_lowercase();
    let mut days: BTreeMap<NaiveDate, ProgressPoint> = BTreeMap::new();

    for workout in workouts {
        for entry in workout
            .exercises
            .iter()
            .filter(|e| e.name.trim().to_lowercase() == wanted)
        {
            for set in entry.sets.iter().filter(|s| counts(workout, s)) {
                let point = days.entry(workout.date).or_insert(ProgressPoint {
                    date: workout.date,
                    best_one_rep_max: 0.0,
                    volume: 0.0,
                });
                point.best_one_rep_max = point
                    .best_one_rep_max
                    .max(formula.estimate(set.weight, i64::from(set.reps)));
                point.volume += set_volume(set);
            }
        }
    }
    days.into_values().collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct MeasurementPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Dated values of one measurement field, skipping entries without it
pub fn measurement_series(measurements: &[BodyMeasurement], field: &str) -> Vec<MeasurementPoint> {
    let mut series: Vec<MeasurementPoint> = measurements
        .iter()
        .filter_map(|m| {
            m.field(field).map(|value| MeasurementPoint {
                date: m.date,
                value,
            })
        })
        .collect();
    series.sort_by_key(|p| p.date);
    series
}

/// Seconds since the workout started, frozen at completion
pub fn elapsed_seconds(workout: &Workout, now_ms: i64) -> Option<i64> {
    let started = workout.started_at?;
    let end = workout.completed_at.unwrap_or(now_ms);
    Some(((end - started) / 1000).max(0))
}

/// `MM:SS`, or `H:MM:SS` past an hour
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn completed(name: &str, on: NaiveDate, exercise: Exercise) -> Workout {
        let mut workout = Workout::new(name, on).exercise(exercise);
        workout.completed = true;
        workout
    }

    #[test]
    fn test_volumes() {
        let squat = Exercise::new("Squat").set(5, 100.0).set(5, 100.0);
        assert_eq!(exercise_volume(&squat), 1000.0);
        let workout = Workout::new("Leg Day", date(3, 4)).exercise(squat);
        assert_eq!(workout_volume(&workout), 1000.0);
        assert_eq!(workout_volume(&Workout::new("Empty", date(3, 4))), 0.0);
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-03-04 is a Monday, 2024-03-10 a Sunday
        assert_eq!(week_start(date(3, 4)), date(3, 4));
        assert_eq!(week_start(date(3, 10)), date(3, 4));
        assert_eq!(week_start(date(3, 11)), date(3, 11));
    }

    #[test]
    fn test_weekly_volume() {
        let workouts = vec![
            completed("A", date(3, 4), Exercise::new("Squat").set(5, 100.0)),
            completed("B", date(3, 10), Exercise::new("Bench").set(10, 50.0)),
            completed("C", date(3, 11), Exercise::new("Row").set(10, 40.0)),
            // Planned only: no completed sets
            Workout::new("D", date(3, 12)).exercise(Exercise::new("Curl").set(10, 10.0)),
        ];

        let weeks = weekly_volume(&workouts);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].week_start, date(3, 4));
        assert_eq!(weeks[0].volume, 1000.0);
        assert_eq!(weeks[0].workouts, 2);
        assert_eq!(weeks[0].iso_week, 10);
        assert_eq!(weeks[1].volume, 400.0);

        let recent = recent_weekly_volume(&workouts, date(3, 20), 4);
        assert_eq!(recent.len(), 4);
        assert_eq!(recent[3].week_start, date(3, 18));
        assert_eq!(recent[3].volume, 0.0);
        assert_eq!(recent[1].volume, 1000.0);

        assert!(weekly_volume(&[]).is_empty());
    }

    #[test]
    fn test_volume_by_category() {
        let workouts = vec![
            completed(
                "A",
                date(3, 4),
                Exercise::new("Squat").set(5, 100.0).category(PrCategory::Squat),
            ),
            completed("B", date(3, 5), Exercise::new("Curl").set(10, 10.0)),
        ];
        let totals = volume_by_category(&workouts);
        assert_eq!(totals[&PrCategory::Squat], 500.0);
        assert_eq!(totals[&PrCategory::Other], 100.0);
        assert!(!totals.contains_key(&PrCategory::Bench));
    }

    #[test]
    fn test_personal_records() {
        let workouts = vec![
            completed("A", date(3, 4), Exercise::new("Squat").set(5, 100.0)),
            completed("B", date(3, 11), Exercise::new("squat").set(3, 110.0)),
        ];
        let lifts = vec![PrLift {
            id: "p1".into(),
            exercise: "Deadlift".into(),
            category: Some(PrCategory::Deadlift),
            weight: 180.0,
            reps: 1,
            date: date(2, 1),
            updated_at: 0,
        }];

        let records = personal_records(&workouts, &lifts, OneRepMaxFormula::Epley);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].exercise, "Deadlift");
        assert_eq!(records[0].estimated_one_rep_max, 180.0);
        // 110 x 3 = 121 beats 100 x 5 = 116.7
        assert_eq!(records[1].weight, 110.0);
        assert_eq!(records[1].date, date(3, 11));
    }

    #[test]
    fn test_exercise_progress() {
        let workouts = vec![
            completed("B", date(3, 11), Exercise::new("Squat").set(3, 110.0).set(5, 90.0)),
            completed("A", date(3, 4), Exercise::new("Squat").set(5, 100.0)),
            completed("C", date(3, 5), Exercise::new("Bench").set(5, 80.0)),
        ];
        let progress = exercise_progress(&workouts, "squat", OneRepMaxFormula::Epley);
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0].date, date(3, 4));
        assert!((progress[1].best_one_rep_max - 121.0).abs() < 1e-9);
        assert_eq!(progress[1].volume, 780.0);
    }

    #[test]
    fn test_measurement_series() {
        let measurements = vec![
            BodyMeasurement::new(date(3, 8)).weight(81.0),
            BodyMeasurement::new(date(3, 1)).weight(82.0),
            BodyMeasurement::new(date(3, 4)).waist(80.0),
        ];
        let series = measurement_series(&measurements, "weight");
        assert_eq!(
            series,
            vec![
                MeasurementPoint { date: date(3, 1), value: 82.0 },
                MeasurementPoint { date: date(3, 8), value: 81.0 },
            ]
        );
        assert!(measurement_series(&measurements, "neck").is_empty());
    }

    #[test]
    fn test_elapsed() {
        let mut workout = Workout::new("Leg Day", date(3, 4));
        assert_eq!(elapsed_seconds(&workout, 10_000), None);

        workout.started_at = Some(1_000);
        assert_eq!(elapsed_seconds(&workout, 91_000), Some(90));
        workout.completed_at = Some(61_000);
        assert_eq!(elapsed_seconds(&workout, 999_000), Some(60));

        assert_eq!(format_elapsed(90), "01:30");
        assert_eq!(format_elapsed(3_725), "1:02:05");
        assert_eq!(format_elapsed(-5), "00:00");
    }
}
