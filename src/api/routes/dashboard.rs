//! Dashboard Route
//!
//! - GET /api/v1/dashboard?date= - Everything the home screen shows

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::analytics::{personal_records, recent_weekly_volume, OneRepMaxFormula};
use crate::api::dto::{DashboardResponse, DateQuery};
use crate::api::routes::training::today;
use crate::api::state::AppState;
use crate::store::{now_millis, PrLift, Workout};

/// PRs shown on the dashboard
const DASHBOARD_PRS: usize = 5;

/// Weeks of volume history shown on the dashboard
const DASHBOARD_WEEKS: usize = 8;

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Json<DashboardResponse> {
    let date = query.date.unwrap_or_else(today);
    let store = &state.store;

    let workouts = store.list::<Workout>().await;
    let lifts = store.list::<PrLift>().await;
    let mut recent_prs = personal_records(&workouts, &lifts, OneRepMaxFormula::default());
    recent_prs.truncate(DASHBOARD_PRS);

    let training_block = store.current_training_block(date).await;
    let block_week = training_block.as_ref().and_then(|b| b.week_of(date));

    Json(DashboardResponse {
        date,
        todays_workout: store.todays_workout(date).await,
        active_workouts: workouts.iter().filter(|w| !w.completed).count(),
        completed_workouts: workouts.iter().filter(|w| w.completed).count(),
        due_reminders: store.get_due_reminders(now_millis()).await,
        recent_prs,
        weekly_volume: recent_weekly_volume(&workouts, date, DASHBOARD_WEEKS),
        training_block,
        block_week,
        deload_mode: store.profile().await.deload_mode,
        readiness_score: store.weekly_recovery().await.readiness_score(),
        units: store.unit_settings().await,
    })
}
