use chrono::{DateTime, Utc};
use serde::Serialize;

use super::session::SessionState;

/// Snapshot of a live session's state and counters
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// Current lifecycle state
    pub state: SessionState,

    /// Short status line for display
    pub status: String,

    /// Whether the microphone is muted
    pub muted: bool,

    /// When the session reached the connected state
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds since the session connected
    pub duration_secs: f64,

    /// Capture buffers delivered by the microphone
    pub frames_captured: usize,

    /// Audio chunks actually transmitted (muted frames are not counted)
    pub chunks_sent: usize,

    /// Inbound audio buffers scheduled for playback
    pub buffers_played: usize,

    /// Inbound payloads dropped because they failed to decode
    pub decode_failures: usize,
}
