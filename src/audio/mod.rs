pub mod capture;
pub mod cpal_backend;
pub mod pcm;
pub mod playback;

pub use capture::{
    CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureDevice, CaptureFrame, NullCapture,
};
pub use playback::{
    NullSink, PlaybackBuffer, PlaybackConfig, PlaybackDevice, PlaybackSink, PlaybackSinkFactory,
    SampleQueue,
};
