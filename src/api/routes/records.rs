//! Record Routes
//!
//! CRUD endpoints shared by every collection without special behaviour:
//! training blocks, measurements, photos, supplements, cycles, supplement
//! logs, weak points, PR lifts, reminders and mood logs. Templates,
//! routines and plans use them for their plain CRUD too.
//!
//! - GET    /api/v1/{collection}       - List
//! - POST   /api/v1/{collection}       - Create
//! - GET    /api/v1/{collection}/:id   - Get
//! - PUT    /api/v1/{collection}/:id   - Replace
//! - DELETE /api/v1/{collection}/:id   - Delete
//!
//! Plus reminders:
//! - GET  /api/v1/reminders/due
//! - POST /api/v1/reminders/:id/complete

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::ListResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::store::{now_millis, Record, Reminder};

pub async fn list<T: Record>(State(state): State<Arc<AppState>>) -> Json<ListResponse<T>> {
    Json(ListResponse::new(state.store.list::<T>().await))
}

pub async fn get<T: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<T>> {
    state
        .store
        .get::<T>(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} {}", T::KIND.label(), id)))
}

pub async fn create<T: Record>(
    State(state): State<Arc<AppState>>,
    Json(record): Json<T>,
) -> ApiResult<(StatusCode, Json<T>)> {
    let created = state.store.add(record).await?;
    tracing::info!(collection = %T::KIND, id = %created.id(), "Created record");
    Ok((StatusCode::CREATED, Json(created)))
}

/// The path id wins over any id in the body
pub async fn update<T: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut record): Json<T>,
) -> ApiResult<Json<T>> {
    record.set_id(id);
    Ok(Json(state.store.update(record).await?))
}

pub async fn delete<T: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete::<T>(&id).await?;
    tracing::info!(collection = %T::KIND, id = %id, "Deleted record");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/reminders/due
pub async fn due_reminders(State(state): State<Arc<AppState>>) -> Json<ListResponse<Reminder>> {
    Json(ListResponse::new(state.store.get_due_reminders(now_millis()).await))
}

/// POST /api/v1/reminders/:id/complete
///
/// Repeating reminders roll forward instead of completing.
pub async fn complete_reminder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Reminder>> {
    Ok(Json(state.store.complete_reminder(&id, now_millis()).await?))
}
