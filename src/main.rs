use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use live_voice::audio::{CaptureConfig, CaptureDevice, PlaybackConfig, PlaybackDevice};
use live_voice::live::{GeminiTransport, LiveConfig, LiveSessionManager, SessionConfig};
use live_voice::{create_router, AppState, Config};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "live-voice", about = "Live voice session service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/live-voice")]
    config: String,

    /// Run without audio hardware (silence in, counted buffers out)
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY environment variable is not set")?;

    let transport = match &cfg.live.endpoint {
        Some(endpoint) => GeminiTransport::with_endpoint(api_key, endpoint),
        None => GeminiTransport::new(api_key),
    };

    let (capture_device, playback_device) = if args.headless {
        info!("Headless mode: using null audio devices");
        (CaptureDevice::Null, PlaybackDevice::Null)
    } else {
        (CaptureDevice::Microphone, PlaybackDevice::Speaker)
    };

    let session_config = SessionConfig {
        live: LiveConfig {
            model: cfg.live.model.clone(),
            voice: cfg.live.voice.clone(),
            system_instruction: cfg.live.system_instruction.clone(),
        },
        capture: CaptureConfig {
            sample_rate: cfg.audio.capture_sample_rate,
            channels: 1,
            buffer_samples: cfg.audio.capture_buffer_samples,
        },
        playback: PlaybackConfig::for_sample_rate(cfg.audio.playback_sample_rate),
        capture_device,
        playback_device,
        connect_timeout: Duration::from_secs(cfg.live.connect_timeout_secs.unwrap_or(15)),
        ..SessionConfig::default()
    };

    let manager = Arc::new(LiveSessionManager::new(session_config, Arc::new(transport)));
    let router = create_router(AppState::new(manager));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, router)
        .await
        .context("HTTP server error")?;

    Ok(())
}
