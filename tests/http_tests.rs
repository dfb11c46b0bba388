// Tests for the HTTP control surface
//
// Drives the real router with a mock transport behind the session manager,
// pinning the status-code mapping: 409 only when a session is already live,
// 503 when the device or transport is the problem.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use live_voice::audio::{CaptureDevice, PlaybackDevice};
use live_voice::live::{
    LiveConfig, LiveSessionManager, LiveTransport, MediaChunk, RemoteSession, SessionConfig,
    SessionEvent,
};
use live_voice::{create_router, AppState};
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Transport that either opens immediately or fails the attempt outright
struct MockTransport {
    healthy: bool,
}

struct MockRemote;

#[async_trait::async_trait]
impl RemoteSession for MockRemote {
    async fn send_realtime(&self, _chunk: MediaChunk) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl LiveTransport for MockTransport {
    async fn connect(
        &self,
        _config: &LiveConfig,
    ) -> Result<(Box<dyn RemoteSession>, mpsc::Receiver<SessionEvent>)> {
        if !self.healthy {
            anyhow::bail!("endpoint unreachable");
        }
        let (tx, rx) = mpsc::channel(8);
        tx.send(SessionEvent::Opened).await.ok();
        Ok((Box::new(MockRemote), rx))
    }
}

fn test_router(healthy: bool) -> axum::Router {
    let config = SessionConfig {
        capture_device: CaptureDevice::Null,
        playback_device: PlaybackDevice::Null,
        connect_timeout: Duration::from_millis(500),
        ..SessionConfig::default()
    };
    let manager = Arc::new(LiveSessionManager::new(
        config,
        Arc::new(MockTransport { healthy }),
    ));
    create_router(AppState::new(manager))
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn test_health_check() {
    let router = test_router(true);
    let response = router.oneshot(get("/health")).await.expect("router serves");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_second_connect_conflicts() {
    let router = test_router(true);

    let first = router
        .clone()
        .oneshot(post("/live/connect"))
        .await
        .expect("router serves");
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .oneshot(post("/live/connect"))
        .await
        .expect("router serves");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_transport_failure_is_service_unavailable() {
    // Not the caller's fault, so not a 409
    let router = test_router(false);

    let response = router
        .oneshot(post("/live/connect"))
        .await
        .expect("router serves");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_mute_without_session_conflicts() {
    let router = test_router(true);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/live/mute")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"muted":true}"#))
                .expect("request builds"),
        )
        .await
        .expect("router serves");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_status_is_always_available() {
    let router = test_router(true);

    let response = router
        .oneshot(get("/live/status"))
        .await
        .expect("router serves");
    assert_eq!(response.status(), StatusCode::OK);
}
