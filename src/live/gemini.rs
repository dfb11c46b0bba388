//! WebSocket implementation of the live transport
//!
//! Speaks the BidiGenerateContent protocol: connect, send the `setup`
//! envelope, then stream `realtimeInput` chunks while forwarding server
//! messages as session events. A writer task owns the socket sink so that
//! `close()` only queues a close frame and never waits on the peer.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use super::messages::{MediaChunk, RealtimeInputMessage, ServerMessage, SetupMessage};
use super::transport::{LiveConfig, LiveTransport, RemoteSession, SessionEvent};

/// Default Live API WebSocket endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

enum WriterCommand {
    Send(String),
    Close,
}

/// Live API transport over a WebSocket
pub struct GeminiTransport {
    endpoint: String,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl LiveTransport for GeminiTransport {
    async fn connect(
        &self,
        config: &LiveConfig,
    ) -> Result<(Box<dyn RemoteSession>, mpsc::Receiver<SessionEvent>)> {
        // The key rides in the query string; never log the full URL
        let url = format!("{}?key={}", self.endpoint, self.api_key);

        info!("Connecting to Live API ({})", config.model);

        let (socket, _response) = connect_async(&url)
            .await
            .context("Failed to open Live API WebSocket")?;

        let (mut sink, mut stream) = socket.split();

        let setup = SetupMessage::new(&config.model, &config.voice, &config.system_instruction);
        let setup_text = serde_json::to_string(&setup).context("Failed to serialize setup")?;
        sink.send(Message::Text(setup_text))
            .await
            .context("Failed to send setup message")?;

        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(64);
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WriterCommand>(64);

        // Writer task: sole owner of the socket sink
        tokio::spawn(async move {
            while let Some(command) = cmd_rx.recv().await {
                match command {
                    WriterCommand::Send(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            warn!("Live API send failed: {}", e);
                            break;
                        }
                    }
                    WriterCommand::Close => {
                        if let Err(e) = sink.send(Message::Close(None)).await {
                            warn!("Live API close failed: {}", e);
                        }
                        break;
                    }
                }
            }
        });

        // Reader task: parse frames into session events
        tokio::spawn(async move {
            let mut opened = false;

            loop {
                let event = match stream.next().await {
                    Some(Ok(Message::Text(text))) => parse_server_message(text.as_bytes()),
                    Some(Ok(Message::Binary(bytes))) => parse_server_message(&bytes),
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = event_tx.send(SessionEvent::Closed).await;
                        break;
                    }
                    Some(Ok(_)) => continue, // ping/pong
                    Some(Err(e)) => {
                        let _ = event_tx.send(SessionEvent::Error(e.to_string())).await;
                        break;
                    }
                };

                let Some(message) = event else { continue };

                if !opened && message.is_setup_complete() {
                    opened = true;
                    if event_tx.send(SessionEvent::Opened).await.is_err() {
                        break;
                    }
                    continue;
                }

                if event_tx.send(SessionEvent::Message(message)).await.is_err() {
                    break;
                }
            }
        });

        Ok((Box::new(GeminiSession { cmd_tx }), event_rx))
    }
}

fn parse_server_message(bytes: &[u8]) -> Option<ServerMessage> {
    match serde_json::from_slice::<ServerMessage>(bytes) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Unparseable Live API frame ({} bytes): {}", bytes.len(), e);
            None
        }
    }
}

struct GeminiSession {
    cmd_tx: mpsc::Sender<WriterCommand>,
}

#[async_trait::async_trait]
impl RemoteSession for GeminiSession {
    async fn send_realtime(&self, chunk: MediaChunk) -> Result<()> {
        let message = RealtimeInputMessage::new(chunk);
        let text = serde_json::to_string(&message).context("Failed to serialize media chunk")?;

        self.cmd_tx
            .send(WriterCommand::Send(text))
            .await
            .map_err(|_| anyhow::anyhow!("Live API writer is gone"))
    }

    async fn close(&self) -> Result<()> {
        self.cmd_tx
            .send(WriterCommand::Close)
            .await
            .map_err(|_| anyhow::anyhow!("Live API writer is gone"))
    }
}
