use super::state::AppState;
use crate::live::{SessionBusy, SessionStats};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MuteRequest {
    /// Desired microphone mute state
    pub muted: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub status: String,
    pub message: String,
    pub stats: Option<SessionStats>,
}

#[derive(Debug, Serialize)]
pub struct MuteResponse {
    pub muted: bool,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub stats: Option<SessionStats>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /live/connect
/// Start the live voice session
pub async fn connect(State(state): State<AppState>) -> impl IntoResponse {
    info!("Connect requested");

    match state.manager.connect().await {
        Ok(session) => {
            let session_id = session.session_id().to_string();
            info!("Live session {} connected", session_id);
            (
                StatusCode::OK,
                Json(ConnectResponse {
                    session_id,
                    status: "connected".to_string(),
                    message: session.status(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to connect live session: {:#}", e);
            // Busy is the caller's conflict; device and transport failures
            // are the service's problem
            let code = if e.downcast_ref::<SessionBusy>().is_some() {
                StatusCode::CONFLICT
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            (
                code,
                Json(ErrorResponse {
                    error: format!("Failed to connect: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /live/disconnect
/// End the live voice session
pub async fn disconnect(State(state): State<AppState>) -> impl IntoResponse {
    info!("Disconnect requested");

    match state.manager.disconnect().await {
        Ok(()) => {
            let stats = state.manager.stats().await;
            (
                StatusCode::OK,
                Json(DisconnectResponse {
                    status: "disconnected".to_string(),
                    message: "Session ended".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to disconnect: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to disconnect: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /live/mute
/// Mute or unmute the microphone while connected
pub async fn set_muted(
    State(state): State<AppState>,
    Json(req): Json<MuteRequest>,
) -> impl IntoResponse {
    match state.manager.set_muted(req.muted).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MuteResponse {
                muted: req.muted,
                status: if req.muted {
                    "Microphone muted".to_string()
                } else {
                    "Microphone live".to_string()
                },
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Failed to set mute: {}", e),
            }),
        )
            .into_response(),
    }
}

/// GET /live/status
/// Current session status and counters
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.manager.status().await;
    let stats = state.manager.stats().await;

    (StatusCode::OK, Json(StatusResponse { status, stats })).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
