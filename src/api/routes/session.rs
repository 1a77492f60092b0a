//! Session Routes
//!
//! Sign-in hands an identity from the hosted auth provider to the sync
//! manager; sign-out drops back to the offline cache.
//!
//! - GET    /api/v1/session      - Current user and sync status
//! - POST   /api/v1/session      - Sign in
//! - DELETE /api/v1/session      - Sign out
//! - GET    /api/v1/sync/status  - Sync status only

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::SessionResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::remote::{SyncStatus, User};
use crate::websocket::WsEvent;

pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: state.sync.current_user().await,
        sync: state.sync.status().await,
    })
}

pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(user): Json<User>,
) -> ApiResult<Json<SessionResponse>> {
    if user.uid.trim().is_empty() {
        return Err(ApiError::Validation("uid must not be empty".to_string()));
    }

    let sync = state.sync.sign_in(user.clone()).await?;
    state
        .ws_hub
        .publish(WsEvent::system(format!("signed in as {}", user.uid)));

    Ok(Json(SessionResponse {
        user: Some(user),
        sync,
    }))
}

pub async fn sign_out(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let sync = state.sync.sign_out().await;
    state.ws_hub.publish(WsEvent::system("signed out"));
    Json(SessionResponse { user: None, sync })
}

pub async fn sync_status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    Json(state.sync.status().await)
}
