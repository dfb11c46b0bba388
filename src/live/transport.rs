use anyhow::Result;
use tokio::sync::mpsc;

use super::messages::{MediaChunk, ServerMessage};

/// Configuration for opening a remote live session
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Model identifier, e.g. "gemini-2.5-flash-native-audio-preview-09-2025"
    pub model: String,
    /// Prebuilt voice preset name, e.g. "Zephyr"
    pub voice: String,
    /// Free-text persona description
    pub system_instruction: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            voice: "Zephyr".to_string(),
            system_instruction:
                "You are a friendly digital literacy assistant. Keep answers concise and helpful."
                    .to_string(),
        }
    }
}

/// Lifecycle events from the remote session
///
/// Delivered in occurrence order; `Opened` always precedes `Message`, and
/// `Closed`/`Error` are terminal for the attempt.
#[derive(Debug)]
pub enum SessionEvent {
    /// The remote session confirmed readiness; audio may now flow
    Opened,
    /// A message envelope arrived
    Message(ServerMessage),
    /// The remote side closed the session
    Closed,
    /// The remote session failed
    Error(String),
}

/// Handle to an open remote streaming session
#[async_trait::async_trait]
pub trait RemoteSession: Send + Sync {
    /// Submit a realtime media chunk (fire-and-forget)
    ///
    /// An error here is non-fatal to the capture loop; callers log and keep
    /// going.
    async fn send_realtime(&self, chunk: MediaChunk) -> Result<()>;

    /// Request close of the remote session
    ///
    /// Returns once the close has been requested; it does not wait for the
    /// peer to confirm.
    async fn close(&self) -> Result<()>;
}

/// Remote streaming transport
///
/// The vendor endpoint behind a seam so it can be substituted in tests.
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    /// Open a session with the given configuration
    ///
    /// Returns the session handle and the event stream. `Opened` is emitted
    /// on the stream once the remote side confirms setup.
    async fn connect(
        &self,
        config: &LiveConfig,
    ) -> Result<(Box<dyn RemoteSession>, mpsc::Receiver<SessionEvent>)>;
}
