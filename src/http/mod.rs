//! HTTP API server for external control (browser front end)
//!
//! This module provides a REST API for controlling the live voice session:
//! - POST /live/connect - Start the session
//! - POST /live/disconnect - End the session
//! - POST /live/mute - Mute/unmute the microphone
//! - GET /live/status - Query session status and counters
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
