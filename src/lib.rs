pub mod audio;
pub mod config;
pub mod http;
pub mod live;

pub use audio::{
    CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureDevice, CaptureFrame,
    PlaybackBuffer, PlaybackConfig, PlaybackDevice, PlaybackSink, PlaybackSinkFactory, SampleQueue,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use live::{
    GeminiTransport, LiveConfig, LiveSession, LiveSessionManager, LiveTransport, MediaChunk,
    RemoteSession, ServerMessage, SessionBusy, SessionConfig, SessionEvent, SessionState,
    SessionStats,
};
