use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::config::SessionConfig;
use super::session::{LiveSession, SessionState};
use super::stats::SessionStats;
use super::transport::LiveTransport;

/// Error returned by `connect()` while a session is already live
///
/// A distinct type so callers (the HTTP surface in particular) can tell the
/// busy case apart from device or transport failures.
#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "A live session is already active; disconnect it first")
    }
}

impl std::error::Error for SessionBusy {}

/// Owner of the single active live session
///
/// Exactly one session may be live at a time; `connect()` fails while one is
/// connecting or connected. A finished session stays in the slot so its stats
/// remain queryable until the next connect replaces it.
pub struct LiveSessionManager {
    config: SessionConfig,
    transport: Arc<dyn LiveTransport>,
    active: Mutex<Option<Arc<LiveSession>>>,
}

impl LiveSessionManager {
    pub fn new(config: SessionConfig, transport: Arc<dyn LiveTransport>) -> Self {
        Self {
            config,
            transport,
            active: Mutex::new(None),
        }
    }

    /// Start a new live session
    ///
    /// Fails if a session is already connecting or connected.
    pub async fn connect(&self) -> Result<Arc<LiveSession>> {
        let mut slot = self.active.lock().await;

        if let Some(session) = slot.as_ref() {
            if matches!(
                session.state(),
                SessionState::Connecting | SessionState::Connected
            ) {
                return Err(SessionBusy.into());
            }
        }

        let mut config = self.config.clone();
        config.session_id = format!("live-{}", uuid::Uuid::new_v4());

        info!("Starting live session {}", config.session_id);

        let session = Arc::new(LiveSession::new(config, Arc::clone(&self.transport)));
        session.connect().await?;

        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Disconnect the active session, if any
    pub async fn disconnect(&self) -> Result<()> {
        let slot = self.active.lock().await;

        match slot.as_ref() {
            Some(session) => session.disconnect().await,
            None => {
                warn!("No live session to disconnect");
                Ok(())
            }
        }
    }

    /// Mute or unmute the active session's microphone
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        let slot = self.active.lock().await;

        match slot.as_ref() {
            Some(session) => session.set_muted(muted),
            None => bail!("No live session is active"),
        }
    }

    /// Stats for the current (or most recent) session
    pub async fn stats(&self) -> Option<SessionStats> {
        let slot = self.active.lock().await;
        slot.as_ref().map(|session| session.stats())
    }

    /// Status line for display
    pub async fn status(&self) -> String {
        let slot = self.active.lock().await;
        match slot.as_ref() {
            Some(session) => session.status(),
            None => "Ready to connect".to_string(),
        }
    }
}
