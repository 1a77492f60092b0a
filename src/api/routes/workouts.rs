//! Workout Routes
//!
//! - GET    /api/v1/workouts?status=active|completed|all
//! - POST   /api/v1/workouts
//! - GET    /api/v1/workouts/:id
//! - PUT    /api/v1/workouts/:id
//! - DELETE /api/v1/workouts/:id
//! - POST   /api/v1/workouts/:id/start     - Stamp the start time
//! - POST   /api/v1/workouts/:id/complete  - Toggle completion

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{ListResponse, WorkoutListQuery, WorkoutStatus};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::store::Workout;

/// GET /api/v1/workouts
pub async fn list_workouts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WorkoutListQuery>,
) -> Json<ListResponse<Workout>> {
    let workouts = match query.status {
        WorkoutStatus::Active => state.store.active_workouts().await,
        WorkoutStatus::Completed => state.store.completed_workouts().await,
        WorkoutStatus::All => state.store.list::<Workout>().await,
    };
    Json(ListResponse::new(workouts))
}

pub async fn get_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Workout>> {
    state
        .store
        .get_workout_by_id(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("workout {}", id)))
}

pub async fn create_workout(
    State(state): State<Arc<AppState>>,
    Json(workout): Json<Workout>,
) -> ApiResult<(StatusCode, Json<Workout>)> {
    let created = state.store.add_workout(workout).await?;
    tracing::info!(workout_id = %created.id, name = %created.name, "Created workout");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut workout): Json<Workout>,
) -> ApiResult<Json<Workout>> {
    workout.id = id;
    Ok(Json(state.store.update_workout(workout).await?))
}

pub async fn delete_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_workout(&id).await?;
    tracing::info!(workout_id = %id, "Deleted workout");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Workout>> {
    Ok(Json(state.store.start_workout(&id).await?))
}

pub async fn complete_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Workout>> {
    let workout = state.store.toggle_workout_completion(&id).await?;
    tracing::info!(workout_id = %id, completed = workout.completed, "Toggled workout completion");
    Ok(Json(workout))
}
