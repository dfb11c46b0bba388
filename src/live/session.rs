use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::audio::{
    pcm, CaptureBackend, CaptureBackendFactory, PlaybackBuffer, PlaybackSink, PlaybackSinkFactory,
};

use super::config::SessionConfig;
use super::messages::MediaChunk;
use super::stats::SessionStats;
use super::transport::{LiveTransport, RemoteSession, SessionEvent};

/// Session lifecycle state
///
/// `connect()` moves Idle/Disconnected/Error → Connecting → Connected.
/// `Error` is equivalent to disconnected: the user must reconnect manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

/// A live voice conversation with the remote model
///
/// Owns the capture stream, the playback sink, and the remote session handle
/// for exactly one conversation. Capture frames flow out through the outbound
/// pump; remote messages flow back through the inbound pump. Both pumps stop
/// on `disconnect()`, which is valid from any state and never waits for the
/// remote side to confirm the close.
pub struct LiveSession {
    config: SessionConfig,
    transport: Arc<dyn LiveTransport>,

    state: Arc<StdMutex<SessionState>>,
    status: Arc<StdMutex<String>>,
    muted: Arc<AtomicBool>,

    /// Cleared first on disconnect; late callbacks become no-ops
    running: Arc<AtomicBool>,

    capture: Mutex<Option<Box<dyn CaptureBackend>>>,
    playback: Mutex<Option<Arc<dyn PlaybackSink>>>,
    remote: Mutex<Option<Arc<dyn RemoteSession>>>,

    outbound_task: Mutex<Option<JoinHandle<()>>>,
    inbound_task: Mutex<Option<JoinHandle<()>>>,

    started_at: Arc<StdMutex<Option<DateTime<Utc>>>>,
    frames_captured: Arc<AtomicUsize>,
    chunks_sent: Arc<AtomicUsize>,
    buffers_played: Arc<AtomicUsize>,
    decode_failures: Arc<AtomicUsize>,
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl LiveSession {
    /// Create a session in the idle state
    pub fn new(config: SessionConfig, transport: Arc<dyn LiveTransport>) -> Self {
        Self::build(config, transport, None, None)
    }

    /// Create a session with specific capture and playback devices instead
    /// of the factory-selected ones
    pub fn with_devices(
        config: SessionConfig,
        transport: Arc<dyn LiveTransport>,
        capture: Box<dyn CaptureBackend>,
        playback: Box<dyn PlaybackSink>,
    ) -> Self {
        Self::build(config, transport, Some(capture), Some(playback))
    }

    fn build(
        config: SessionConfig,
        transport: Arc<dyn LiveTransport>,
        capture: Option<Box<dyn CaptureBackend>>,
        playback: Option<Box<dyn PlaybackSink>>,
    ) -> Self {
        Self {
            config,
            transport,
            state: Arc::new(StdMutex::new(SessionState::Idle)),
            status: Arc::new(StdMutex::new("Ready to connect".to_string())),
            muted: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            capture: Mutex::new(capture),
            playback: Mutex::new(playback.map(Arc::from)),
            remote: Mutex::new(None),
            outbound_task: Mutex::new(None),
            inbound_task: Mutex::new(None),
            started_at: Arc::new(StdMutex::new(None)),
            frames_captured: Arc::new(AtomicUsize::new(0)),
            chunks_sent: Arc::new(AtomicUsize::new(0)),
            buffers_played: Arc::new(AtomicUsize::new(0)),
            decode_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Open the session: acquire devices, open the remote session, and wire
    /// the audio pumps once the remote side confirms readiness
    ///
    /// A no-op if already connecting or connected. Any failure along the way
    /// releases everything acquired so far and leaves the session in `Error`.
    pub async fn connect(&self) -> Result<()> {
        match self.state() {
            SessionState::Connecting | SessionState::Connected => {
                warn!("Session {} already active, ignoring connect", self.config.session_id);
                return Ok(());
            }
            _ => {}
        }

        info!("Connecting session {}", self.config.session_id);
        self.set_state(SessionState::Connecting, "Connecting...");

        match self.try_connect().await {
            Ok(()) => {
                info!("Session {} connected", self.config.session_id);
                Ok(())
            }
            Err(e) => {
                error!("Session {} failed to connect: {:#}", self.config.session_id, e);
                self.running.store(false, Ordering::SeqCst);
                self.release_resources().await;
                // A disconnect() issued mid-attempt has already moved the
                // session to Disconnected; that stays the terminal state.
                {
                    let mut state = lock_or_recover(&self.state);
                    if *state == SessionState::Connecting {
                        *state = SessionState::Error;
                        *lock_or_recover(&self.status) = "Connection failed".to_string();
                    }
                }
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<()> {
        // Device acquisition first: a denied microphone blocks the whole
        // attempt before any remote state exists. Pre-injected devices
        // (from `with_devices`) are kept as-is.
        {
            let mut guard = self.capture.lock().await;
            if guard.is_none() {
                *guard = Some(
                    CaptureBackendFactory::create(
                        self.config.capture_device,
                        self.config.capture.clone(),
                    )
                    .context("Failed to acquire capture device")?,
                );
            }
        }

        let playback: Arc<dyn PlaybackSink> = {
            let mut guard = self.playback.lock().await;
            if guard.is_none() {
                *guard = Some(Arc::from(
                    PlaybackSinkFactory::create(
                        self.config.playback_device,
                        self.config.playback.clone(),
                    )
                    .context("Failed to open playback device")?,
                ));
            }
            Arc::clone(guard.as_ref().context("Playback sink missing")?)
        };

        let (remote, mut events) = self
            .transport
            .connect(&self.config.live)
            .await
            .context("Failed to open remote session")?;
        let remote: Arc<dyn RemoteSession> = Arc::from(remote);
        *self.remote.lock().await = Some(Arc::clone(&remote));

        // No audio is sent before the remote session confirms readiness
        self.wait_for_open(&mut events).await?;

        self.running.store(true, Ordering::SeqCst);
        {
            let mut started = lock_or_recover(&self.started_at);
            *started = Some(Utc::now());
        }

        let frames = {
            let mut guard = self.capture.lock().await;
            let capture = guard.as_mut().context("Capture backend missing")?;
            capture.start().await.context("Failed to start capture")?
        };

        self.spawn_outbound(frames, Arc::clone(&remote)).await;
        self.spawn_inbound(events, playback).await;

        self.set_state(SessionState::Connected, "Connected! Speak now.");
        Ok(())
    }

    /// Wait for the `Opened` event, bounded by the connect timeout
    async fn wait_for_open(
        &self,
        events: &mut tokio::sync::mpsc::Receiver<SessionEvent>,
    ) -> Result<()> {
        let opened = tokio::time::timeout(self.config.connect_timeout, async {
            loop {
                match events.recv().await {
                    Some(SessionEvent::Opened) => return Ok(()),
                    Some(SessionEvent::Error(e)) => {
                        bail!("Remote session failed to open: {}", e)
                    }
                    Some(SessionEvent::Closed) | None => {
                        bail!("Remote session closed before opening")
                    }
                    Some(SessionEvent::Message(_)) => {
                        // Out-of-order message before open confirmation
                        warn!("Message received before open confirmation, ignoring");
                    }
                }
            }
        })
        .await;

        match opened {
            Ok(result) => result,
            Err(_) => bail!(
                "Timed out after {:?} waiting for remote session to open",
                self.config.connect_timeout
            ),
        }
    }

    /// Outbound path: capture frame → PCM → base64 → realtime chunk
    async fn spawn_outbound(
        &self,
        mut frames: tokio::sync::mpsc::Receiver<crate::audio::CaptureFrame>,
        remote: Arc<dyn RemoteSession>,
    ) {
        let running = Arc::clone(&self.running);
        let muted = Arc::clone(&self.muted);
        let frames_captured = Arc::clone(&self.frames_captured);
        let chunks_sent = Arc::clone(&self.chunks_sent);

        let task = tokio::spawn(async move {
            info!("Outbound audio task started");

            while let Some(frame) = frames.recv().await {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                frames_captured.fetch_add(1, Ordering::SeqCst);

                // Muted: capture keeps running, nothing is transmitted
                if muted.load(Ordering::SeqCst) {
                    continue;
                }

                let chunk = MediaChunk {
                    mime_type: pcm::CAPTURE_MIME_TYPE.to_string(),
                    data: pcm::encode_chunk(&frame.samples),
                };

                // A rejected send must not halt capture
                match remote.send_realtime(chunk).await {
                    Ok(()) => {
                        chunks_sent.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => error!("Failed to send audio chunk: {}", e),
                }
            }

            info!("Outbound audio task stopped");
        });

        *self.outbound_task.lock().await = Some(task);
    }

    /// Inbound path: message → base64 decode → 24kHz PCM → playback
    async fn spawn_inbound(
        &self,
        mut events: tokio::sync::mpsc::Receiver<SessionEvent>,
        playback: Arc<dyn PlaybackSink>,
    ) {
        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);
        let status = Arc::clone(&self.status);
        let buffers_played = Arc::clone(&self.buffers_played);
        let decode_failures = Arc::clone(&self.decode_failures);
        let playback_rate = self.config.playback.sample_rate;

        let task = tokio::spawn(async move {
            info!("Inbound audio task started");

            while let Some(event) = events.recv().await {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                match event {
                    SessionEvent::Message(message) => {
                        let Some(payload) = message.inline_audio() else {
                            continue;
                        };

                        match pcm::decode_payload(payload) {
                            Ok(samples) => {
                                let buffer = PlaybackBuffer {
                                    samples,
                                    sample_rate: playback_rate,
                                };
                                match playback.play(buffer) {
                                    Ok(()) => {
                                        buffers_played.fetch_add(1, Ordering::SeqCst);
                                    }
                                    Err(e) => warn!("Failed to schedule playback: {}", e),
                                }
                            }
                            Err(e) => {
                                // Drop the frame, keep the session alive
                                decode_failures.fetch_add(1, Ordering::SeqCst);
                                warn!("Dropping undecodable audio frame: {}", e);
                            }
                        }
                    }
                    SessionEvent::Closed => {
                        info!("Remote session closed");
                        running.store(false, Ordering::SeqCst);
                        store_state(&state, &status, SessionState::Disconnected, "Disconnected");
                        break;
                    }
                    SessionEvent::Error(e) => {
                        error!("Remote session error: {}", e);
                        running.store(false, Ordering::SeqCst);
                        store_state(&state, &status, SessionState::Error, "Connection error");
                        break;
                    }
                    SessionEvent::Opened => {
                        // Open is consumed during connect; duplicates are ignored
                    }
                }
            }

            info!("Inbound audio task stopped");
        });

        *self.inbound_task.lock().await = Some(task);
    }

    /// Tear the session down: stop capture, close playback, request remote
    /// close asynchronously
    ///
    /// Valid from any state and idempotent. Each step tolerates failure of
    /// the previous one; the local state always ends `Disconnected`.
    pub async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting session {}", self.config.session_id);

        self.running.store(false, Ordering::SeqCst);
        self.release_resources().await;
        self.set_state(SessionState::Disconnected, "Disconnected");

        Ok(())
    }

    async fn release_resources(&self) {
        // 1. Stop the capture device
        let capture = self.capture.lock().await.take();
        if let Some(mut capture) = capture {
            if let Err(e) = capture.stop().await {
                error!("Failed to stop capture: {}", e);
            }
        }

        // 2. Close the playback sink
        let playback = self.playback.lock().await.take();
        if let Some(playback) = playback {
            if let Err(e) = playback.close().await {
                error!("Failed to close playback: {}", e);
            }
        }

        // 3. Request remote close without waiting for confirmation
        let remote = self.remote.lock().await.take();
        if let Some(remote) = remote {
            tokio::spawn(async move {
                if let Err(e) = remote.close().await {
                    warn!("Remote close request failed: {}", e);
                }
            });
        }

        // 4. Stop the pump tasks (their channels are gone by now; abort
        //    covers a task parked on a silent receiver)
        if let Some(task) = self.outbound_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.inbound_task.lock().await.take() {
            task.abort();
        }
    }

    /// Mute or unmute the microphone
    ///
    /// Only valid while connected. Capture keeps running while muted so the
    /// device does not have to be re-acquired on unmute.
    pub fn set_muted(&self, muted: bool) -> Result<()> {
        let state = self.state();
        if state != SessionState::Connected {
            bail!("Cannot change mute state while {:?}", state);
        }

        self.muted.store(muted, Ordering::SeqCst);
        info!(
            "Session {} microphone {}",
            self.config.session_id,
            if muted { "muted" } else { "unmuted" }
        );

        Ok(())
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SessionState {
        *lock_or_recover(&self.state)
    }

    /// Short status line for display
    pub fn status(&self) -> String {
        lock_or_recover(&self.status).clone()
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Snapshot of state and counters
    pub fn stats(&self) -> SessionStats {
        let started_at = *lock_or_recover(&self.started_at);
        let duration_secs = started_at
            .map(|t| Utc::now().signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.state(),
            status: self.status(),
            muted: self.is_muted(),
            started_at,
            duration_secs,
            frames_captured: self.frames_captured.load(Ordering::SeqCst),
            chunks_sent: self.chunks_sent.load(Ordering::SeqCst),
            buffers_played: self.buffers_played.load(Ordering::SeqCst),
            decode_failures: self.decode_failures.load(Ordering::SeqCst),
        }
    }

    fn set_state(&self, next: SessionState, status: &str) {
        store_state(&self.state, &self.status, next, status);
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        // Implicit teardown: nothing may outlive the session. The capture
        // and playback threads stop on their own drop handlers; the remote
        // close is spawned when a runtime is still available.
        if self.running.swap(false, Ordering::SeqCst) {
            warn!("Session {} dropped while active", self.config.session_id);

            if let Ok(mut guard) = self.outbound_task.try_lock() {
                if let Some(task) = guard.take() {
                    task.abort();
                }
            }
            if let Ok(mut guard) = self.inbound_task.try_lock() {
                if let Some(task) = guard.take() {
                    task.abort();
                }
            }

            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                if let Ok(mut guard) = self.remote.try_lock() {
                    if let Some(remote) = guard.take() {
                        handle.spawn(async move {
                            let _ = remote.close().await;
                        });
                    }
                }
            }
        }
    }
}

fn store_state(
    state: &StdMutex<SessionState>,
    status: &StdMutex<String>,
    next: SessionState,
    text: &str,
) {
    *lock_or_recover(state) = next;
    *lock_or_recover(status) = text.to_string();
}

fn lock_or_recover<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
