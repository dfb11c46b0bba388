//! Live voice session management
//!
//! This module provides the bidirectional streaming session between the
//! microphone and the remote conversational model:
//! - Session lifecycle (connect, disconnect, mute) as an explicit state machine
//! - Outbound path: capture → 16-bit PCM → base64 → realtime media chunk
//! - Inbound path: base64 PCM at 24kHz → playback buffer → output device
//! - Transport abstraction with a WebSocket implementation of the Live API

mod config;
pub mod gemini;
mod manager;
pub mod messages;
mod session;
mod stats;
pub mod transport;

pub use config::SessionConfig;
pub use gemini::GeminiTransport;
pub use manager::{LiveSessionManager, SessionBusy};
pub use messages::{MediaChunk, ServerMessage};
pub use session::{LiveSession, SessionState};
pub use stats::SessionStats;
pub use transport::{LiveConfig, LiveTransport, RemoteSession, SessionEvent};
