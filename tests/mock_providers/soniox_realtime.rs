//! WebSocket mock of the streaming transcription endpoint.
//!
//! Records the handshake and every frame it receives. In `Echo` mode each
//! non-empty audio frame produces one token event and the empty frame
//! produces the `finished` event.

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Answer every audio frame, finish on the empty frame
    Echo,
    /// Close right after reading the configuration
    CloseAfterConfig,
    /// Send a provider error event, then close
    RejectConfig,
}

#[derive(Debug, Default)]
pub struct RealtimeMockState {
    pub connections: AtomicUsize,
    pub configs: Mutex<Vec<Value>>,
    /// Sizes of binary frames, including the zero-length terminator
    pub audio_frames: Mutex<Vec<usize>>,
    /// Text frames after the configuration
    pub control_messages: Mutex<Vec<String>>,
}

impl RealtimeMockState {
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn configs(&self) -> Vec<Value> {
        self.configs.lock().unwrap().clone()
    }

    pub fn audio_frames(&self) -> Vec<usize> {
        self.audio_frames.lock().unwrap().clone()
    }

    pub fn control_messages(&self) -> Vec<String> {
        self.control_messages.lock().unwrap().clone()
    }
}

pub struct RealtimeMock {
    pub addr: SocketAddr,
    pub state: Arc<RealtimeMockState>,
}

impl RealtimeMock {
    pub async fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(RealtimeMockState::default());

        let server_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = server_state.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state, behavior).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<RealtimeMockState>,
    behavior: Behavior,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    state.connections.fetch_add(1, Ordering::SeqCst);

    // First frame is the configuration
    match read.next().await {
        Some(Ok(Message::Text(text))) => {
            let config: Value = serde_json::from_str(text.as_str())?;
            state.configs.lock().unwrap().push(config);
        }
        _ => return Ok(()),
    }

    match behavior {
        Behavior::CloseAfterConfig => {
            write.send(Message::Close(None)).await?;
            return Ok(());
        }
        Behavior::RejectConfig => {
            let error = json!({
                "tokens": [],
                "error_code": 401,
                "error_message": "Invalid API key",
            });
            write.send(Message::text(error.to_string())).await?;
            write.send(Message::Close(None)).await?;
            return Ok(());
        }
        Behavior::Echo => {}
    }

    let mut frames = 0u64;
    while let Some(message) = read.next().await {
        match message? {
            Message::Binary(data) => {
                state.audio_frames.lock().unwrap().push(data.len());
                if data.is_empty() {
                    let finished = json!({"tokens": [], "finished": true});
                    write.send(Message::text(finished.to_string())).await?;
                    write.send(Message::Close(None)).await?;
                    break;
                }
                frames += 1;
                let event = json!({
                    "tokens": [{"text": format!("frame-{frames}"), "is_final": true}],
                    "final_audio_proc_ms": frames * 100,
                });
                write.send(Message::text(event.to_string())).await?;
            }
            Message::Text(text) => {
                state
                    .control_messages
                    .lock()
                    .unwrap()
                    .push(text.as_str().to_string());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
