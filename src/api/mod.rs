//! IronLog REST API
//!
//! HTTP API layer for IronLog, built with Axum. Every screen of the app
//! maps onto these routes.
//!
//! # Endpoints
//!
//! ## Overview
//! - `GET /api/v1/dashboard` - Today's plan, counts, reminders, PRs, volume
//! - `GET /api/v1/schedule/today` - Template the active routine schedules
//! - `GET /api/v1/schedule/routine` - Active routine
//! - `GET /api/v1/schedule/block` - Current training block
//!
//! ## Training
//! - `/api/v1/workouts` - CRUD, `?status=active|completed`, `/:id/start`, `/:id/complete`
//! - `/api/v1/templates` - CRUD, `/:id/favorite`, `/:id/start`
//! - `/api/v1/routines` - CRUD, `/:id/archive`
//! - `/api/v1/plans` - CRUD, `/:id/activate`, `/:id/toggle`
//! - `/api/v1/blocks` - CRUD
//!
//! ## Tracking
//! - `/api/v1/measurements`, `/photos`, `/supplements`, `/cycles`,
//!   `/supplement-logs`, `/weak-points`, `/pr-lifts`, `/mood-logs` - CRUD
//! - `/api/v1/reminders` - CRUD, `/due`, `/:id/complete`
//!
//! ## Settings
//! - `GET|PUT /api/v1/settings/units`, `GET|PUT /api/v1/profile`,
//!   `PUT /api/v1/profile/deload`, `GET|PUT /api/v1/recovery`
//! - `GET /api/v1/favorites`, `POST /api/v1/favorites/:name`
//!
//! ## Analytics
//! - `GET /api/v1/analytics/{one-rep-max,convert,volume,prs,progress,measurements}`
//!
//! ## Data
//! - `GET /api/v1/export` - JSON or CSV export
//! - `POST /api/v1/import` - Restore a JSON export
//!
//! ## Session
//! - `GET|POST|DELETE /api/v1/session` - Sign in / out
//! - `GET /api/v1/sync/status` - Sync status
//!
//! ## Health
//! - `GET /health/live`, `GET /health/ready`, `GET /health`
//!
//! ## WebSocket
//! - `GET /api/v1/ws` - Change feed
//!
//! # Example
//!
//! ```rust,ignore
//! use ironlog::api::{serve, ApiConfig, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig::default();
//!     let state = AppState::in_memory(config.clone())?;
//!     serve(state, &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::store::{
    BodyMeasurement, MoodLog, PrLift, ProgressPhoto, Record, Reminder, SteroidCycle, Supplement,
    SupplementLog, TrainingBlock, WeakPoint, WeeklyRoutine, WorkoutPlan, WorkoutTemplate,
};
use crate::websocket::websocket_handler;
use routes::{analytics, dashboard, export, health, records, session, settings, training, workouts};

type ApiRouter = Router<Arc<AppState>>;

/// List/create at `path`, get/replace/delete at `path/:id`
fn crud<T: Record>(router: ApiRouter, path: &str) -> ApiRouter {
    router
        .route(path, get(records::list::<T>).post(records::create::<T>))
        .route(
            &format!("{}/:id", path),
            get(records::get::<T>)
                .put(records::update::<T>)
                .delete(records::delete::<T>),
        )
}

fn training_routes(router: ApiRouter) -> ApiRouter {
    router
        .route(
            "/workouts",
            get(workouts::list_workouts).post(workouts::create_workout),
        )
        .route(
            "/workouts/:id",
            get(workouts::get_workout)
                .put(workouts::update_workout)
                .delete(workouts::delete_workout),
        )
        .route("/workouts/:id/start", post(workouts::start_workout))
        .route("/workouts/:id/complete", post(workouts::complete_workout))
        .route(
            "/templates",
            get(records::list::<WorkoutTemplate>).post(training::create_template),
        )
        .route(
            "/templates/:id",
            get(records::get::<WorkoutTemplate>)
                .put(records::update::<WorkoutTemplate>)
                .delete(records::delete::<WorkoutTemplate>),
        )
        .route("/templates/:id/favorite", post(training::toggle_template_favorite))
        .route("/templates/:id/start", post(training::start_from_template))
        .route("/routines/:id/archive", post(training::archive_routine))
        .route(
            "/plans/:id",
            get(training::get_plan).delete(records::delete::<WorkoutPlan>),
        )
        .route("/plans/:id/activate", post(training::activate_plan))
        .route("/plans/:id/toggle", post(training::toggle_plan))
        .route("/plans", get(records::list::<WorkoutPlan>).post(records::create::<WorkoutPlan>))
        .route("/schedule/today", get(training::todays_workout))
        .route("/schedule/routine", get(training::active_routine))
        .route("/schedule/block", get(training::current_block))
}

fn tracking_routes(router: ApiRouter) -> ApiRouter {
    let router = router
        .route("/reminders/due", get(records::due_reminders))
        .route("/reminders/:id/complete", post(records::complete_reminder));

    let router = crud::<WeeklyRoutine>(router, "/routines");
    let router = crud::<TrainingBlock>(router, "/blocks");
    let router = crud::<BodyMeasurement>(router, "/measurements");
    let router = crud::<ProgressPhoto>(router, "/photos");
    let router = crud::<Supplement>(router, "/supplements");
    let router = crud::<SteroidCycle>(router, "/cycles");
    let router = crud::<SupplementLog>(router, "/supplement-logs");
    let router = crud::<WeakPoint>(router, "/weak-points");
    let router = crud::<PrLift>(router, "/pr-lifts");
    let router = crud::<Reminder>(router, "/reminders");
    crud::<MoodLog>(router, "/mood-logs")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        // Settings and favorites
        .route(
            "/settings/units",
            get(settings::get_units).put(settings::put_units),
        )
        .route(
            "/profile",
            get(settings::get_profile).put(settings::put_profile),
        )
        .route("/profile/deload", put(settings::put_deload))
        .route(
            "/recovery",
            get(settings::get_recovery).put(settings::put_recovery),
        )
        .route("/favorites", get(settings::list_favorites))
        .route("/favorites/:name", post(settings::toggle_favorite))
        // Analytics
        .route("/analytics/one-rep-max", get(analytics::one_rep_max))
        .route("/analytics/convert", get(analytics::convert_units))
        .route("/analytics/volume", get(analytics::volume))
        .route("/analytics/prs", get(analytics::prs))
        .route("/analytics/progress", get(analytics::progress))
        .route("/analytics/measurements", get(analytics::measurements))
        // Export / import
        .route("/export", get(export::export_data))
        .route("/import", post(export::import_data))
        // Session and sync
        .route(
            "/session",
            get(session::get_session)
                .post(session::sign_in)
                .delete(session::sign_out),
        )
        .route("/sync/status", get(session::sync_status))
        // WebSocket route
        .route("/ws", get(websocket_handler));
    let api_routes = tracking_routes(training_routes(api_routes))
        .layer(DefaultBodyLimit::max(state.config.max_body_size));

    let health_routes = Router::new()
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/", get(health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("IronLog API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("IronLog API shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        build_router(AppState::in_memory(ApiConfig::default()).unwrap())
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn leg_day() -> Value {
        json!({
            "name": "Leg Day",
            "date": "2024-03-04",
            "exercises": [{"name": "Squat", "sets": [{"reps": 5, "weight": 100.0}]}]
        })
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = create_test_app();
        assert_eq!(call(&app, "GET", "/health/live", None).await.0, StatusCode::OK);
        assert_eq!(call(&app, "GET", "/health/ready", None).await.0, StatusCode::OK);

        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["signed_in"], false);
    }

    #[tokio::test]
    async fn test_workout_lifecycle() {
        let app = create_test_app();

        let (status, created) = call(&app, "POST", "/api/v1/workouts", Some(leg_day())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let (status, fetched) = call(&app, "GET", &format!("/api/v1/workouts/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, completed) =
            call(&app, "POST", &format!("/api/v1/workouts/{}/complete", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completed["completed"], true);

        let (_, done) = call(&app, "GET", "/api/v1/workouts?status=completed", None).await;
        assert_eq!(done["total"], 1);
        let (_, active) = call(&app, "GET", "/api/v1/workouts?status=active", None).await;
        assert_eq!(active["total"], 0);

        let (status, _) = call(&app, "DELETE", &format!("/api/v1/workouts/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(&app, "GET", &format!("/api/v1/workouts/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_validation_errors_are_bad_requests() {
        let app = create_test_app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/workouts",
            Some(json!({"name": "  ", "date": "2024-03-04"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = call(&app, "GET", "/api/v1/analytics/convert?value=1&from=kg&to=cm", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_plan_activation_is_exclusive() {
        let app = create_test_app();
        let mut ids = Vec::new();
        for name in ["Strength", "Hypertrophy"] {
            let (_, plan) = call(&app, "POST", "/api/v1/plans", Some(json!({"name": name}))).await;
            ids.push(plan["id"].as_str().unwrap().to_string());
        }

        for id in &ids {
            let (status, _) = call(&app, "POST", &format!("/api/v1/plans/{}/activate", id), None).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, plans) = call(&app, "GET", "/api/v1/plans", None).await;
        let active: Vec<&str> = plans["items"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|p| p["active"] == true)
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(active, vec![ids[1].as_str()]);
    }

    #[tokio::test]
    async fn test_template_start_and_schedule() {
        let app = create_test_app();
        let (status, template) = call(
            &app,
            "POST",
            "/api/v1/templates",
            Some(json!({"name": "Push", "exercises": [{"name": "Bench", "sets": [{"reps": 8, "weight": 60.0}]}]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let template_id = template["id"].as_str().unwrap();

        // 2024-03-04 is a Monday
        call(
            &app,
            "POST",
            "/api/v1/routines",
            Some(json!({"name": "PPL", "days": {"monday": template_id}})),
        )
        .await;
        let (_, today) = call(&app, "GET", "/api/v1/schedule/today?date=2024-03-04", None).await;
        assert_eq!(today["template_id"], template_id);
        assert_eq!(today["template"]["name"], "Push");

        let (status, workout) = call(
            &app,
            "POST",
            &format!("/api/v1/templates/{}/start", template_id),
            Some(json!({"date": "2024-03-04"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(workout["template_id"], template_id);
        assert!(workout["started_at"].is_i64());
    }

    #[tokio::test]
    async fn test_analytics_endpoints() {
        let app = create_test_app();
        let (status, body) =
            call(&app, "GET", "/api/v1/analytics/one-rep-max?weight=100&reps=5", None).await;
        assert_eq!(status, StatusCode::OK);
        let estimate = body["estimate"].as_f64().unwrap();
        assert!((estimate - 116.666_666).abs() < 1e-3);

        let mut completed = leg_day();
        completed["completed"] = json!(true);
        call(&app, "POST", "/api/v1/workouts", Some(completed)).await;

        let (_, prs) = call(&app, "GET", "/api/v1/analytics/prs", None).await;
        assert_eq!(prs[0]["exercise"], "Squat");

        let (_, progress) =
            call(&app, "GET", "/api/v1/analytics/progress?exercise=squat", None).await;
        assert_eq!(progress["points"].as_array().unwrap().len(), 1);

        let (status, _) = call(&app, "GET", "/api/v1/analytics/volume?weeks=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_settings_and_favorites() {
        let app = create_test_app();
        let (status, units) = call(
            &app,
            "PUT",
            "/api/v1/settings/units",
            Some(json!({"mass": "lbs", "length": "in"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(units["mass"], "lbs");

        let (_, profile) = call(&app, "PUT", "/api/v1/profile/deload", Some(json!({"enabled": true}))).await;
        assert_eq!(profile["deload_mode"], true);

        let (_, fav) = call(&app, "POST", "/api/v1/favorites/Deadlift", None).await;
        assert_eq!(fav["favorite"], true);
        let (_, fav) = call(&app, "POST", "/api/v1/favorites/Deadlift", None).await;
        assert_eq!(fav["favorite"], false);

        let (status, _) = call(&app, "PUT", "/api/v1/recovery", Some(json!({"soreness": 42}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tracking_crud_and_reminders() {
        let app = create_test_app();
        let (status, measurement) = call(
            &app,
            "POST",
            "/api/v1/measurements",
            Some(json!({"date": "2024-03-04", "weight": 82.5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let id = measurement["id"].as_str().unwrap();
        let (status, updated) = call(
            &app,
            "PUT",
            &format!("/api/v1/measurements/{}", id),
            Some(json!({"date": "2024-03-04", "weight": 81.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], id);

        let (_, series) = call(&app, "GET", "/api/v1/analytics/measurements?field=weight", None).await;
        assert_eq!(series["points"][0]["value"], 81.0);

        let (_, reminder) = call(
            &app,
            "POST",
            "/api/v1/reminders",
            Some(json!({"title": "Creatine", "due_at": 0})),
        )
        .await;
        let (_, due) = call(&app, "GET", "/api/v1/reminders/due", None).await;
        assert_eq!(due["total"], 1);

        let reminder_id = reminder["id"].as_str().unwrap();
        call(&app, "POST", &format!("/api/v1/reminders/{}/complete", reminder_id), None).await;
        let (_, due) = call(&app, "GET", "/api/v1/reminders/due", None).await;
        assert_eq!(due["total"], 0);
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let source = create_test_app();
        call(&source, "POST", "/api/v1/workouts", Some(leg_day())).await;
        call(&source, "POST", "/api/v1/plans", Some(json!({"name": "Strength"}))).await;

        let response = source
            .clone()
            .oneshot(Request::builder().uri("/api/v1/export").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let export = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let target = create_test_app();
        let response = target
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/import")
                    .body(Body::from(export))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, workouts) = call(&target, "GET", "/api/v1/workouts", None).await;
        let (_, original) = call(&source, "GET", "/api/v1/workouts", None).await;
        assert_eq!(workouts, original);

        let (status, _) = call(&target, "POST", "/api/v1/import", Some(json!({"version": 99}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&source, "GET", "/api/v1/export?format=xml", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = create_test_app();
        let (status, session) = call(
            &app,
            "POST",
            "/api/v1/session",
            Some(json!({"uid": "u1", "auth_method": {"type": "email_password"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["user"]["uid"], "u1");
        assert_eq!(session["sync"]["signed_in"], true);

        let (_, status_body) = call(&app, "GET", "/api/v1/sync/status", None).await;
        assert_eq!(status_body["uid"], "u1");

        let (_, session) = call(&app, "DELETE", "/api/v1/session", None).await;
        assert!(session["user"].is_null());
        assert_eq!(session["sync"]["signed_in"], false);
    }

    #[tokio::test]
    async fn test_dashboard() {
        let app = create_test_app();
        call(&app, "POST", "/api/v1/workouts", Some(leg_day())).await;

        let (status, body) = call(&app, "GET", "/api/v1/dashboard?date=2024-03-06", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_workouts"], 1);
        assert_eq!(body["weekly_volume"].as_array().unwrap().len(), 8);
        assert!(body["todays_workout"].is_null());
        assert_eq!(body["units"]["mass"], "kg");
    }
}
