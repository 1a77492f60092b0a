//! Benchmarks for IronLog analytics and persistence
//!
//! Run with: cargo bench

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ironlog::analytics::{
    exercise_progress, personal_records, recent_weekly_volume, volume_by_category, weekly_volume,
    OneRepMaxFormula,
};
use ironlog::local::{hydrate, persist_all, LocalCache, DEFAULT_QUOTA_BYTES};
use ironlog::store::{DataExport, Exercise, FitnessStore, Origin, Workout};
use tempfile::tempdir;

const LIFTS: [&str; 5] = ["Squat", "Bench Press", "Deadlift", "Overhead Press", "Row"];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// One completed workout per day, three lifts each
fn create_test_workouts(count: usize) -> Vec<Workout> {
    (0..count)
        .map(|i| {
            let mut workout = Workout::new(format!("Session {}", i), start() + Duration::days(i as i64));
            for lift in LIFTS.iter().cycle().skip(i % LIFTS.len()).take(3) {
                let weight = 60.0 + (i % 40) as f64 * 2.5;
                workout = workout.exercise(
                    Exercise::new(*lift)
                        .set(5, weight)
                        .set(5, weight)
                        .set(3, weight + 5.0),
                );
            }
            workout.id = format!("w{}", i);
            workout.completed = true;
            workout
        })
        .collect()
}

fn bench_one_rep_max(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_rep_max");

    for formula in [OneRepMaxFormula::Epley, OneRepMaxFormula::Brzycki] {
        group.bench_function(format!("{:?}", formula).to_lowercase(), |b| {
            b.iter(|| {
                (1..=12)
                    .map(|reps| formula.estimate(black_box(100.0), reps))
                    .sum::<f64>()
            })
        });
    }

    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");

    for size in [100, 1000] {
        let workouts = create_test_workouts(size);
        let today = start() + Duration::days(size as i64);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("weekly_volume_{}", size), |b| {
            b.iter(|| weekly_volume(black_box(&workouts)))
        });

        group.bench_function(format!("recent_weekly_volume_{}", size), |b| {
            b.iter(|| recent_weekly_volume(black_box(&workouts), today, 8))
        });

        group.bench_function(format!("volume_by_category_{}", size), |b| {
            b.iter(|| volume_by_category(black_box(&workouts)))
        });

        group.bench_function(format!("personal_records_{}", size), |b| {
            b.iter(|| personal_records(black_box(&workouts), &[], OneRepMaxFormula::Epley))
        });

        group.bench_function(format!("exercise_progress_{}", size), |b| {
            b.iter(|| exercise_progress(black_box(&workouts), "squat", OneRepMaxFormula::Epley))
        });
    }

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("store");

    group.bench_function("add_workout", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let store = FitnessStore::new();
                let workout = create_test_workouts(1).remove(0);

                let start = std::time::Instant::now();

                for _ in 0..iters {
                    store.add_workout(workout.clone()).await.unwrap();
                }

                start.elapsed()
            })
        });
    });

    group.bench_function("export_import_1000", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let store = FitnessStore::new();
                store
                    .replace_all(create_test_workouts(1000), Origin::Local)
                    .await
                    .unwrap();

                let start = std::time::Instant::now();

                for _ in 0..iters {
                    let json = store.export().await.to_json().unwrap();
                    let export = DataExport::from_json(black_box(&json)).unwrap();
                    store.import(export).await.unwrap();
                }

                start.elapsed()
            })
        });
    });

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("cache");

    group.bench_function("persist_hydrate_1000", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let dir = tempdir().unwrap();
                let cache = LocalCache::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
                let store = FitnessStore::new();
                store
                    .replace_all(create_test_workouts(1000), Origin::Local)
                    .await
                    .unwrap();

                let start = std::time::Instant::now();

                for _ in 0..iters {
                    persist_all(&store, &cache).await.unwrap();
                    let fresh = FitnessStore::new();
                    hydrate(&fresh, black_box(&cache)).await.unwrap();
                }

                start.elapsed()
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_one_rep_max, bench_aggregation, bench_store, bench_cache);
criterion_main!(benches);
