use anyhow::Result;
use tokio::sync::mpsc;

use super::pcm;

/// A buffer of captured microphone audio (mono f32 samples)
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Raw audio samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture sample rate (the Live API expects 16kHz)
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Samples per delivered buffer
    pub buffer_samples: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: pcm::CAPTURE_SAMPLE_RATE,
            channels: 1,
            buffer_samples: pcm::CAPTURE_BUFFER_SAMPLES,
        }
    }
}

/// Microphone capture backend trait
///
/// Implementations:
/// - cpal: real microphone input via the default input device
/// - Null: silence generator (for tests and headless runs)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive capture frames
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>>;

    /// Stop capturing audio and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture device selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureDevice {
    /// Default system microphone (cpal)
    Microphone,
    /// Silence generator (no hardware required)
    Null,
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create a capture backend for the given device
    ///
    /// Acquiring the microphone fails here (not at `start`) when no input
    /// device is available, so a denied or missing device blocks `connect()`.
    pub fn create(device: CaptureDevice, config: CaptureConfig) -> Result<Box<dyn CaptureBackend>> {
        match device {
            CaptureDevice::Microphone => {
                let backend = super::cpal_backend::CpalCapture::new(config)?;
                Ok(Box::new(backend))
            }
            CaptureDevice::Null => Ok(Box::new(NullCapture::new(config))),
        }
    }
}

/// Silence-generating capture backend
///
/// Emits zero-filled frames at the real-time rate of the configured buffer
/// size. Useful for exercising the session pipeline without a microphone.
pub struct NullCapture {
    config: CaptureConfig,
    stop_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl NullCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_tx: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for NullCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>> {
        if self.stop_tx.is_some() {
            anyhow::bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(16);
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
        self.stop_tx = Some(stop_tx);

        let sample_rate = self.config.sample_rate;
        let buffer_samples = self.config.buffer_samples;
        let interval = std::time::Duration::from_millis(
            (buffer_samples as u64 * 1000) / sample_rate as u64,
        );

        tokio::spawn(async move {
            let mut timestamp_ms = 0u64;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = tokio::time::sleep(interval) => {
                        let frame = CaptureFrame {
                            samples: vec![0.0; buffer_samples],
                            sample_rate,
                            timestamp_ms,
                        };
                        timestamp_ms += interval.as_millis() as u64;
                        if tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.stop_tx.is_some()
    }

    fn name(&self) -> &str {
        "null"
    }
}
