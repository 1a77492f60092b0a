//! Analytics Routes
//!
//! Calculators and chart data derived from the store.
//!
//! - GET /api/v1/analytics/one-rep-max?weight=&reps=&formula=
//! - GET /api/v1/analytics/convert?value=&from=&to=
//! - GET /api/v1/analytics/volume?weeks=
//! - GET /api/v1/analytics/prs?formula=
//! - GET /api/v1/analytics/progress?exercise=&formula=
//! - GET /api/v1/analytics/measurements?field=

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::analytics::{
    convert, exercise_progress, measurement_series, personal_records, recent_weekly_volume,
    volume_by_category, OneRepMaxFormula, PersonalRecord, Unit,
};
use crate::api::dto::{
    ConvertQuery, ConvertResponse, FormulaQuery, MeasurementQuery, MeasurementSeriesResponse,
    OneRepMaxQuery, OneRepMaxResponse, ProgressQuery, ProgressResponse, VolumeQuery,
    VolumeResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::training::today;
use crate::api::state::AppState;
use crate::store::{PrLift, Workout};

/// Longest volume history a single request may ask for
const MAX_VOLUME_WEEKS: usize = 520;

fn parse_formula(formula: Option<&str>) -> ApiResult<OneRepMaxFormula> {
    formula
        .map(str::parse)
        .transpose()
        .map_err(ApiError::Validation)
        .map(Option::unwrap_or_default)
}

fn parse_unit(unit: &str) -> ApiResult<Unit> {
    unit.parse().map_err(ApiError::Validation)
}

pub async fn one_rep_max(Query(query): Query<OneRepMaxQuery>) -> ApiResult<Json<OneRepMaxResponse>> {
    let formula = parse_formula(query.formula.as_deref())?;
    Ok(Json(OneRepMaxResponse {
        weight: query.weight,
        reps: query.reps,
        formula: format!("{:?}", formula).to_lowercase(),
        estimate: formula.estimate(query.weight, query.reps),
    }))
}

pub async fn convert_units(Query(query): Query<ConvertQuery>) -> ApiResult<Json<ConvertResponse>> {
    let from = parse_unit(&query.from)?;
    let to = parse_unit(&query.to)?;
    let result = convert(query.value, from, to).ok_or_else(|| {
        ApiError::Validation(format!("Cannot convert {} to {}", query.from, query.to))
    })?;

    Ok(Json(ConvertResponse {
        value: query.value,
        from: query.from,
        to: query.to,
        result,
    }))
}

pub async fn volume(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VolumeQuery>,
) -> ApiResult<Json<VolumeResponse>> {
    if query.weeks == 0 || query.weeks > MAX_VOLUME_WEEKS {
        return Err(ApiError::Validation(format!(
            "weeks must be between 1 and {}",
            MAX_VOLUME_WEEKS
        )));
    }

    let workouts = state.store.list::<Workout>().await;
    let weekly = recent_weekly_volume(&workouts, today(), query.weeks);
    let total = weekly.iter().map(|w| w.volume).sum();

    Ok(Json(VolumeResponse {
        weekly,
        by_category: volume_by_category(&workouts),
        total,
    }))
}

pub async fn prs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FormulaQuery>,
) -> ApiResult<Json<Vec<PersonalRecord>>> {
    let formula = parse_formula(query.formula.as_deref())?;
    let workouts = state.store.list::<Workout>().await;
    let lifts = state.store.list::<PrLift>().await;
    Ok(Json(personal_records(&workouts, &lifts, formula)))
}

pub async fn progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressQuery>,
) -> ApiResult<Json<ProgressResponse>> {
    if query.exercise.trim().is_empty() {
        return Err(ApiError::Validation("exercise must not be empty".to_string()));
    }
    let formula = parse_formula(query.formula.as_deref())?;
    let workouts = state.store.list::<Workout>().await;

    Ok(Json(ProgressResponse {
        points: exercise_progress(&workouts, &query.exercise, formula),
        exercise: query.exercise,
    }))
}

pub async fn measurements(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MeasurementQuery>,
) -> Json<MeasurementSeriesResponse> {
    let measurements = state.store.body_measurements().await;
    Json(MeasurementSeriesResponse {
        points: measurement_series(&measurements, &query.field),
        field: query.field,
    })
}
