//! Playback sink abstraction for synthesized audio
//!
//! Inbound frames are scheduled in receipt order. The sink absorbs bursts in
//! a bounded sample queue: when the remote endpoint produces audio faster
//! than real time, the oldest buffered samples are dropped so playback stays
//! near-live instead of drifting further and further behind.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info, warn};

use super::pcm;

/// A decoded buffer of synthesized audio ready for playback
#[derive(Debug, Clone)]
pub struct PlaybackBuffer {
    /// Mono f32 samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl PlaybackBuffer {
    /// Number of audio frames in this buffer (mono: one sample per frame)
    pub fn frames(&self) -> usize {
        self.samples.len()
    }
}

/// Configuration for playback sinks
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Playback sample rate (the Live API produces 24kHz)
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Maximum buffered samples before old audio is dropped
    pub max_buffered_samples: usize,
}

impl PlaybackConfig {
    /// Mono config for the given output rate
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            // 10 seconds of headroom before old audio is dropped
            max_buffered_samples: sample_rate as usize * 10,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::for_sample_rate(pcm::PLAYBACK_SAMPLE_RATE)
    }
}

/// Audio playback sink trait
#[async_trait::async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Schedule a buffer for playback (fire-and-forget)
    fn play(&self, buffer: PlaybackBuffer) -> Result<()>;

    /// Stop playback and release the output device
    async fn close(&self) -> Result<()>;

    /// Get sink name for logging
    fn name(&self) -> &str;
}

/// Playback device selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackDevice {
    /// Default system output device (cpal)
    Speaker,
    /// Counting sink with no audio output
    Null,
}

/// Playback sink factory
pub struct PlaybackSinkFactory;

impl PlaybackSinkFactory {
    pub fn create(device: PlaybackDevice, config: PlaybackConfig) -> Result<Box<dyn PlaybackSink>> {
        match device {
            PlaybackDevice::Speaker => {
                let sink = CpalSink::new(config)?;
                Ok(Box::new(sink))
            }
            PlaybackDevice::Null => Ok(Box::new(NullSink::new())),
        }
    }
}

/// Bounded FIFO of interleaved samples with drop-oldest overflow
///
/// Shared between the session side (pushing decoded buffers) and the audio
/// output callback (draining at the device rate).
#[derive(Clone)]
pub struct SampleQueue {
    samples: Arc<Mutex<VecDeque<f32>>>,
    max_samples: usize,
}

impl SampleQueue {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(max_samples.min(65536)))),
            max_samples,
        }
    }

    /// Append samples, dropping the oldest buffered audio when over capacity.
    ///
    /// Returns the number of samples dropped.
    pub fn push(&self, samples: &[f32]) -> usize {
        let mut queue = match self.samples.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        queue.extend(samples.iter().copied());

        let mut dropped = 0;
        while queue.len() > self.max_samples {
            queue.pop_front();
            dropped += 1;
        }

        dropped
    }

    /// Fill `out` from the front of the queue, zero-filling on underrun.
    pub fn drain_into(&self, out: &mut [f32]) {
        let mut queue = match self.samples.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        for slot in out.iter_mut() {
            *slot = queue.pop_front().unwrap_or(0.0);
        }
    }

    /// Number of samples currently buffered
    pub fn len(&self) -> usize {
        match self.samples.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all buffered audio
    pub fn clear(&self) {
        match self.samples.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

/// Speaker playback via the default cpal output device
///
/// The output stream lives on its own thread (cpal streams are not `Send`)
/// and pulls from the shared sample queue in its realtime callback.
pub struct CpalSink {
    config: PlaybackConfig,
    queue: SampleQueue,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CpalSink {
    pub fn new(config: PlaybackConfig) -> Result<Self> {
        cpal::default_host()
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;

        let queue = SampleQueue::new(config.max_buffered_samples);
        let running = Arc::new(AtomicBool::new(true));

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let callback_queue = queue.clone();
        let thread_running = Arc::clone(&running);

        let thread = std::thread::spawn(move || {
            let device = match cpal::default_host().default_output_device() {
                Some(device) => device,
                None => {
                    let _ = ready_tx.send(Err(anyhow!("No output device available")));
                    return;
                }
            };

            let stream = device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| {
                    callback_queue.drain_into(data);
                },
                |err| warn!("cpal output stream error: {}", err),
                None,
            );

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(
                        anyhow!(e).context("Failed to build cpal output stream")
                    ));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(anyhow!(e).context("Failed to start output stream")));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            while thread_running.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }

            drop(stream);
        });

        ready_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .context("Playback thread did not report readiness")??;

        info!("cpal playback started ({}Hz)", config.sample_rate);

        Ok(Self {
            config,
            queue,
            running,
            thread: Mutex::new(Some(thread)),
        })
    }
}

#[async_trait::async_trait]
impl PlaybackSink for CpalSink {
    fn play(&self, buffer: PlaybackBuffer) -> Result<()> {
        if buffer.sample_rate != self.config.sample_rate {
            anyhow::bail!(
                "Buffer rate {}Hz does not match sink rate {}Hz",
                buffer.sample_rate,
                self.config.sample_rate
            );
        }

        let dropped = self.queue.push(&buffer.samples);
        if dropped > 0 {
            debug!("Playback queue over capacity, dropped {} oldest samples", dropped);
        }

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.queue.clear();

        let thread = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(thread) = thread {
            tokio::task::spawn_blocking(move || {
                let _ = thread.join();
            })
            .await
            .context("Playback thread shutdown failed")?;
        }

        info!("cpal playback stopped");
        Ok(())
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Counting sink that discards audio (for tests and headless runs)
pub struct NullSink {
    buffers_played: Arc<AtomicUsize>,
    frames_played: Arc<AtomicUsize>,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            buffers_played: Arc::new(AtomicUsize::new(0)),
            frames_played: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of buffers scheduled on this sink
    pub fn buffers_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.buffers_played)
    }

    /// Shared counter of audio frames scheduled on this sink
    pub fn frames_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.frames_played)
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PlaybackSink for NullSink {
    fn play(&self, buffer: PlaybackBuffer) -> Result<()> {
        self.buffers_played.fetch_add(1, Ordering::SeqCst);
        self.frames_played.fetch_add(buffer.frames(), Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
