use std::time::Duration;

use crate::audio::{CaptureConfig, CaptureDevice, PlaybackConfig, PlaybackDevice};

use super::transport::LiveConfig;

/// Configuration for a live voice session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier (e.g. "live-4c2a...")
    pub session_id: String,

    /// Remote session configuration (model, voice, persona)
    pub live: LiveConfig,

    /// Microphone capture parameters (16kHz mono, 4096-sample buffers)
    pub capture: CaptureConfig,

    /// Playback parameters (24kHz mono)
    pub playback: PlaybackConfig,

    /// Which capture device to acquire
    pub capture_device: CaptureDevice,

    /// Which playback device to open
    pub playback_device: PlaybackDevice,

    /// How long to wait for the remote session to confirm readiness
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            live: LiveConfig::default(),
            capture: CaptureConfig::default(),
            playback: PlaybackConfig::default(),
            capture_device: CaptureDevice::Microphone,
            playback_device: PlaybackDevice::Speaker,
            connect_timeout: Duration::from_secs(15),
        }
    }
}
