//! Settings Routes
//!
//! Singleton documents and favorites.
//!
//! - GET|PUT /api/v1/settings/units
//! - GET|PUT /api/v1/profile
//! - PUT     /api/v1/profile/deload
//! - GET|PUT /api/v1/recovery
//! - GET     /api/v1/favorites
//! - POST    /api/v1/favorites/:name  - Toggle an exercise in favorites

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{DeloadRequest, FavoriteResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::store::{UnitSettings, UserProfile, WeeklyRecovery};

pub async fn get_units(State(state): State<Arc<AppState>>) -> Json<UnitSettings> {
    Json(state.store.unit_settings().await)
}

pub async fn put_units(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<UnitSettings>,
) -> ApiResult<Json<UnitSettings>> {
    let saved = state.store.set_unit_settings(settings).await?;
    tracing::info!(mass = %saved.mass, length = %saved.length, "Updated unit settings");
    Ok(Json(saved))
}

pub async fn get_profile(State(state): State<Arc<AppState>>) -> Json<UserProfile> {
    Json(state.store.profile().await)
}

pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<UserProfile>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.store.set_profile(profile).await?))
}

pub async fn put_deload(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeloadRequest>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.store.set_deload_mode(req.enabled).await?))
}

pub async fn get_recovery(State(state): State<Arc<AppState>>) -> Json<WeeklyRecovery> {
    Json(state.store.weekly_recovery().await)
}

pub async fn put_recovery(
    State(state): State<Arc<AppState>>,
    Json(recovery): Json<WeeklyRecovery>,
) -> ApiResult<Json<WeeklyRecovery>> {
    Ok(Json(state.store.set_weekly_recovery(recovery).await?))
}

pub async fn list_favorites(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.store.favorite_exercises().await)
}

pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<FavoriteResponse>> {
    let favorite = state.store.toggle_favorite_exercise(&name).await?;
    Ok(Json(FavoriteResponse {
        name,
        favorite,
        favorites: state.store.favorite_exercises().await,
    }))
}
