//! Export Routes
//!
//! Backup and restore of the whole data set.
//!
//! - GET  /api/v1/export?format=json|csv&collection=workouts|measurements
//! - POST /api/v1/import - Replace everything with a JSON export

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{ExportQuery, ImportResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::store::{measurements_to_csv, workouts_to_csv, DataExport, ExportFormat, StoreError, Workout};

/// GET /api/v1/export
///
/// JSON exports contain everything and can be re-imported. CSV exports
/// flatten one collection for spreadsheets.
pub async fn export_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportQuery>,
) -> ApiResult<Response> {
    let format: ExportFormat = params
        .format
        .as_deref()
        .unwrap_or("json")
        .parse()
        .map_err(|e: StoreError| ApiError::Validation(e.to_string()))?;

    let (body, name) = match format {
        ExportFormat::Json => (state.store.export().await.to_json()?, "ironlog_export"),
        ExportFormat::Csv => match params.collection.as_deref().unwrap_or("workouts") {
            "workouts" => (
                workouts_to_csv(&state.store.list::<Workout>().await)?,
                "ironlog_workouts",
            ),
            "measurements" => (
                measurements_to_csv(&state.store.body_measurements().await)?,
                "ironlog_measurements",
            ),
            other => {
                return Err(ApiError::Validation(format!(
                    "Cannot export {} as CSV. Use workouts or measurements",
                    other
                )))
            }
        },
    };

    let filename = format!(
        "{}_{}.{}",
        name,
        Utc::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    );
    tracing::info!(filename = %filename, bytes = body.len(), "Exported data");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from(body),
    )
        .into_response())
}

/// POST /api/v1/import
///
/// Counts as a local edit: a signed-in session pushes the result.
pub async fn import_data(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<Json<ImportResponse>> {
    let export = DataExport::from_json(&body).map_err(|e| ApiError::Validation(e.to_string()))?;
    let records = state.store.import(export).await?;

    Ok(Json(ImportResponse {
        status: "ok".to_string(),
        records,
    }))
}
