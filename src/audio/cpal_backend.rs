//! Microphone capture backend using cpal
//!
//! The cpal stream is not `Send`, so a dedicated thread owns the device and
//! stream for the life of the capture. Samples are accumulated into fixed-size
//! buffers inside the realtime callback and forwarded over a tokio channel;
//! the callback never blocks, so a full channel drops the frame instead.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::capture::{CaptureBackend, CaptureConfig, CaptureFrame};

/// Microphone capture via the default cpal input device
pub struct CpalCapture {
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CpalCapture {
    /// Create the backend, verifying that an input device exists.
    ///
    /// A missing or inaccessible microphone fails here so the caller can
    /// surface it as a connection failure before any session state exists.
    pub fn new(config: CaptureConfig) -> Result<Self> {
        cpal::default_host()
            .default_input_device()
            .ok_or_else(|| anyhow!("No microphone available"))?;

        info!(
            "cpal capture initialized ({}Hz, {} samples/buffer)",
            config.sample_rate, config.buffer_samples
        );

        Ok(Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }

    fn stream_config(&self) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: self.config.channels,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for CpalCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>> {
        if self.running.load(Ordering::SeqCst) {
            anyhow::bail!("Already capturing");
        }

        let (frame_tx, frame_rx) = mpsc::channel::<CaptureFrame>(16);
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<Result<()>>();

        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        let stream_config = self.stream_config();
        let sample_rate = self.config.sample_rate;
        let buffer_samples = self.config.buffer_samples;

        let thread_running = Arc::clone(&running);
        let thread = std::thread::spawn(move || {
            let device = match cpal::default_host().default_input_device() {
                Some(device) => device,
                None => {
                    let _ = ready_tx.send(Err(anyhow!("No microphone available")));
                    return;
                }
            };

            let pending: Arc<Mutex<Vec<f32>>> =
                Arc::new(Mutex::new(Vec::with_capacity(buffer_samples * 2)));
            let samples_sent = Arc::new(AtomicU64::new(0));

            let callback_pending = Arc::clone(&pending);
            let callback_sent = Arc::clone(&samples_sent);
            let stream = device.build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    let mut buffered = match callback_pending.lock() {
                        Ok(guard) => guard,
                        Err(_) => return,
                    };
                    buffered.extend_from_slice(data);

                    while buffered.len() >= buffer_samples {
                        let samples: Vec<f32> = buffered.drain(..buffer_samples).collect();
                        let sent = callback_sent.fetch_add(buffer_samples as u64, Ordering::SeqCst);
                        let frame = CaptureFrame {
                            samples,
                            sample_rate,
                            timestamp_ms: sent * 1000 / sample_rate as u64,
                        };
                        if frame_tx.try_send(frame).is_err() {
                            // Receiver is full or gone; dropping keeps the
                            // realtime callback from ever blocking.
                        }
                    }
                },
                |err| warn!("cpal input stream error: {}", err),
                None,
            );

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(
                        anyhow!(e).context("Failed to build cpal input stream")
                    ));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(anyhow!(e).context("Failed to start cpal stream")));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            while thread_running.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }

            // Dropping the stream releases the device
            drop(stream);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("cpal capture started");
                self.thread = Some(thread);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(anyhow!("Capture thread exited before reporting readiness"))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Stopping cpal capture");

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || {
                let _ = thread.join();
            })
            .await
            .context("Capture thread shutdown failed")?;
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        // Signal the stream thread even if stop() was never called
        self.running.store(false, Ordering::SeqCst);
    }
}
