//! Training Routes
//!
//! Actions on templates, routines and plans beyond plain CRUD.
//!
//! - POST /api/v1/templates               - Create a template
//! - POST /api/v1/templates/:id/favorite  - Toggle favorite
//! - POST /api/v1/templates/:id/start     - Start a workout from the template
//! - POST /api/v1/routines/:id/archive    - Archive a routine
//! - GET  /api/v1/schedule/today?date=    - What the active routine schedules
//! - GET  /api/v1/schedule/routine        - The routine in effect
//! - GET  /api/v1/plans/:id               - Get a plan
//! - POST /api/v1/plans/:id/activate      - Make the only active plan
//! - POST /api/v1/plans/:id/toggle        - Flip one plan's active flag
//! - GET  /api/v1/schedule/block?date=    - Training block containing the date

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::api::dto::{DateQuery, StartWorkoutRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::store::{
    ScheduledWorkout, TrainingBlock, WeeklyRoutine, Workout, WorkoutPlan, WorkoutTemplate,
};

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(template): Json<WorkoutTemplate>,
) -> ApiResult<(StatusCode, Json<WorkoutTemplate>)> {
    let created = state.store.add_template(template).await?;
    tracing::info!(template_id = %created.id, name = %created.name, "Created template");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn toggle_template_favorite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkoutTemplate>> {
    Ok(Json(state.store.toggle_template_favorite(&id).await?))
}

/// The body is optional; an empty one starts the workout today
pub async fn start_from_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<StartWorkoutRequest>>,
) -> ApiResult<(StatusCode, Json<Workout>)> {
    let date = body.and_then(|Json(req)| req.date).unwrap_or_else(today);
    let workout = state.store.start_workout_from_template(&id, date).await?;
    tracing::info!(template_id = %id, workout_id = %workout.id, "Started workout from template");
    Ok((StatusCode::CREATED, Json(workout)))
}

pub async fn archive_routine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<WeeklyRoutine>> {
    Ok(Json(state.store.archive_routine(&id).await?))
}

pub async fn active_routine(State(state): State<Arc<AppState>>) -> ApiResult<Json<WeeklyRoutine>> {
    state
        .store
        .active_routine()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no active routine".to_string()))
}

/// `null` when nothing is scheduled
pub async fn todays_workout(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Json<Option<ScheduledWorkout>> {
    let date = query.date.unwrap_or_else(today);
    Json(state.store.todays_workout(date).await)
}

pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkoutPlan>> {
    state
        .store
        .get_workout_plan(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("workout plan {}", id)))
}

pub async fn activate_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkoutPlan>> {
    let plan = state.store.set_active_plan(&id).await?;
    tracing::info!(plan_id = %id, "Activated plan");
    Ok(Json(plan))
}

pub async fn toggle_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkoutPlan>> {
    Ok(Json(state.store.toggle_plan_active(&id).await?))
}

pub async fn current_block(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Json<Option<TrainingBlock>> {
    let date = query.date.unwrap_or_else(today);
    Json(state.store.current_training_block(date).await)
}
