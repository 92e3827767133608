use std::fmt;
use std::time::Duration;

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::config::{ClientConfig, UpstreamConfig};
use super::{RelayError, is_finished_event};

/// How long a client may take to send its configuration.
const DEFAULT_CONFIG_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the upstream WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Finished,
    Closed,
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames_forwarded: u64,
    pub bytes_forwarded: u64,
    pub events_forwarded: u64,
    /// Upstream sent `"finished": true`.
    pub finished: bool,
    /// An error event reached the client.
    pub error_reported: bool,
}

/// Accepts relay sessions and connects each to the provider.
#[derive(Debug, Clone)]
pub struct RealtimeRelay {
    upstream_url: String,
    default_model: String,
    config_timeout: Duration,
}

impl RealtimeRelay {
    pub fn new(upstream_url: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            default_model: default_model.into(),
            config_timeout: DEFAULT_CONFIG_TIMEOUT,
        }
    }

    pub fn with_config_timeout(mut self, config_timeout: Duration) -> Self {
        self.config_timeout = config_timeout;
        self
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    /// Relay one accepted client socket until both directions are done.
    pub async fn run(&self, socket: WebSocket) -> SessionSummary {
        let (client_tx, client_rx) = socket.split();
        self.serve(client_rx, client_tx).await
    }

    /// Same as [`run`](Self::run) over an already split client connection.
    pub async fn serve<CS, CE, CK>(&self, mut client_rx: CS, client_tx: CK) -> SessionSummary
    where
        CS: Stream<Item = Result<ClientMessage, CE>> + Unpin + Send + 'static,
        CE: fmt::Display + Send + 'static,
        CK: Sink<ClientMessage> + Unpin + Send + 'static,
        CK::Error: fmt::Display + Send,
    {
        let session_id = Uuid::new_v4();
        let span = info_span!("relay_session", %session_id);

        async move {
            let mut state = SessionState::Connecting;
            info!(?state, "Relay session opened");

            let config = match tokio::time::timeout(
                self.config_timeout,
                read_client_config(&mut client_rx, &self.default_model),
            )
            .await
            {
                Ok(Ok(config)) => config,
                Ok(Err(e)) => return reject(client_tx, e).await,
                Err(_) => {
                    let e = RelayError::ConfigTimeout(self.config_timeout.as_secs());
                    return reject(client_tx, e).await;
                }
            };

            let handshake = match serde_json::to_string(&config) {
                Ok(handshake) => handshake,
                Err(e) => return reject(client_tx, RelayError::InvalidConfig(e.to_string())).await,
            };

            info!(
                model = %config.model,
                audio_format = %config.audio_format,
                "Connecting to transcription service"
            );
            let upstream = match tokio::time::timeout(
                CONNECT_TIMEOUT,
                connect_async(self.upstream_url.as_str()),
            )
            .await
            {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(e)) => {
                    return reject(client_tx, RelayError::UpstreamConnect(e.to_string())).await;
                }
                Err(_) => {
                    let e = RelayError::UpstreamConnect("connection timed out".to_string());
                    return reject(client_tx, e).await;
                }
            };

            let (mut upstream_tx, upstream_rx) = upstream.split();
            if let Err(e) = upstream_tx.send(UpstreamMessage::Text(handshake.into())).await {
                close_sink(upstream_tx, "upstream").await;
                return reject(client_tx, RelayError::Upstream(e.to_string())).await;
            }

            state = SessionState::Streaming;
            debug!(?state, "Upstream accepted configuration");

            let summary = pump_session(client_rx, client_tx, upstream_rx, upstream_tx).await;

            state = if summary.finished {
                SessionState::Finished
            } else {
                SessionState::Closed
            };
            info!(
                ?state,
                frames = summary.frames_forwarded,
                bytes = summary.bytes_forwarded,
                events = summary.events_forwarded,
                "Relay session closed"
            );
            summary
        }
        .instrument(span)
        .await
    }
}

/// Wait for the configuration message and validate it.
///
/// Control frames are skipped. Anything else before a text frame is an error.
pub async fn read_client_config<CS, CE>(
    client_rx: &mut CS,
    default_model: &str,
) -> Result<UpstreamConfig, RelayError>
where
    CS: Stream<Item = Result<ClientMessage, CE>> + Unpin,
    CE: fmt::Display,
{
    loop {
        match client_rx.next().await {
            Some(Ok(ClientMessage::Text(text))) => {
                return ClientConfig::from_text(text.as_str())?.into_upstream(default_model);
            }
            Some(Ok(ClientMessage::Binary(_))) => return Err(RelayError::UnexpectedFrame("binary")),
            Some(Ok(ClientMessage::Ping(_) | ClientMessage::Pong(_))) => continue,
            Some(Ok(ClientMessage::Close(_))) | None => return Err(RelayError::ClientGone),
            Some(Err(e)) => return Err(RelayError::Client(e.to_string())),
        }
    }
}

enum ClientLoopEnd {
    EndOfAudio,
    Disconnected,
    Stopped,
    UpstreamFailed(RelayError),
}

struct ClientLoopOutcome<UK> {
    upstream_tx: UK,
    end: ClientLoopEnd,
    frames: u64,
    bytes: u64,
}

enum UpstreamLoopEnd {
    Finished,
    Closed,
    Failed,
    ClientGone,
}

struct UpstreamLoopOutcome<CK> {
    client_tx: CK,
    end: UpstreamLoopEnd,
    events: u64,
    error_reported: bool,
}

/// Run both relay directions to completion and tear the session down.
///
/// Each direction runs in its own task and hands its sink back over a
/// one-shot channel. Upstream is closed before the client, and each side is
/// closed exactly once.
pub async fn pump_session<CS, CE, CK, US, UE, UK>(
    client_rx: CS,
    client_tx: CK,
    upstream_rx: US,
    upstream_tx: UK,
) -> SessionSummary
where
    CS: Stream<Item = Result<ClientMessage, CE>> + Unpin + Send + 'static,
    CE: fmt::Display + Send + 'static,
    CK: Sink<ClientMessage> + Unpin + Send + 'static,
    CK::Error: fmt::Display + Send,
    US: Stream<Item = Result<UpstreamMessage, UE>> + Unpin + Send + 'static,
    UE: fmt::Display + Send + 'static,
    UK: Sink<UpstreamMessage> + Unpin + Send + 'static,
    UK::Error: fmt::Display + Send,
{
    let (client_done_tx, client_done_rx) = oneshot::channel();
    let (upstream_done_tx, upstream_done_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    tokio::spawn(
        async move {
            let outcome = forward_client_audio(client_rx, upstream_tx, stop_rx).await;
            let _ = client_done_tx.send(outcome);
        }
        .in_current_span(),
    );
    tokio::spawn(
        async move {
            let outcome = forward_upstream_events(upstream_rx, client_tx).await;
            let _ = upstream_done_tx.send(outcome);
        }
        .in_current_span(),
    );

    let upstream_outcome = upstream_done_rx.await;
    // The client may still be connected and silent; stop reading from it.
    let _ = stop_tx.send(());
    let client_outcome = client_done_rx.await;

    let mut summary = SessionSummary::default();
    let mut pending_error = None;

    let upstream_tx = match client_outcome {
        Ok(outcome) => {
            summary.frames_forwarded = outcome.frames;
            summary.bytes_forwarded = outcome.bytes;
            match outcome.end {
                ClientLoopEnd::UpstreamFailed(e) => pending_error = Some(e),
                ClientLoopEnd::EndOfAudio => debug!("Client finished sending audio"),
                ClientLoopEnd::Disconnected => debug!("Client disconnected"),
                ClientLoopEnd::Stopped => debug!("Client reader stopped"),
            }
            Some(outcome.upstream_tx)
        }
        Err(_) => {
            error!("Client relay task ended without reporting");
            None
        }
    };

    let mut client_tx = match upstream_outcome {
        Ok(outcome) => {
            summary.events_forwarded = outcome.events;
            summary.error_reported = outcome.error_reported;
            match outcome.end {
                UpstreamLoopEnd::Finished => summary.finished = true,
                UpstreamLoopEnd::Closed => debug!("Upstream closed before finishing"),
                UpstreamLoopEnd::Failed => debug!("Upstream connection failed"),
                UpstreamLoopEnd::ClientGone => debug!("Client went away while forwarding results"),
            }
            Some(outcome.client_tx)
        }
        Err(_) => {
            error!("Upstream relay task ended without reporting");
            None
        }
    };

    if let (Some(error), Some(tx)) = (pending_error, client_tx.as_mut())
        && !summary.error_reported
    {
        summary.error_reported = send_error_event(tx, &error).await;
    }

    if let Some(tx) = upstream_tx {
        close_sink(tx, "upstream").await;
    }
    if let Some(tx) = client_tx {
        close_sink(tx, "client").await;
    }

    summary
}

async fn forward_client_audio<CS, CE, UK>(
    mut client_rx: CS,
    mut upstream_tx: UK,
    mut stop: oneshot::Receiver<()>,
) -> ClientLoopOutcome<UK>
where
    CS: Stream<Item = Result<ClientMessage, CE>> + Unpin,
    CE: fmt::Display,
    UK: Sink<UpstreamMessage> + Unpin,
    UK::Error: fmt::Display,
{
    let mut frames = 0;
    let mut bytes = 0;

    let end = loop {
        let message = tokio::select! {
            _ = &mut stop => break ClientLoopEnd::Stopped,
            message = client_rx.next() => message,
        };

        match message {
            Some(Ok(ClientMessage::Binary(data))) => {
                let end_of_audio = data.is_empty();
                let len = data.len() as u64;
                if let Err(e) = upstream_tx.send(UpstreamMessage::Binary(data)).await {
                    break ClientLoopEnd::UpstreamFailed(RelayError::Upstream(e.to_string()));
                }
                if end_of_audio {
                    break ClientLoopEnd::EndOfAudio;
                }
                frames += 1;
                bytes += len;
            }
            Some(Ok(ClientMessage::Text(text))) => {
                // Control messages (keepalive, finalize) pass through untouched.
                let forwarded = UpstreamMessage::Text(text.as_str().to_owned().into());
                if let Err(e) = upstream_tx.send(forwarded).await {
                    break ClientLoopEnd::UpstreamFailed(RelayError::Upstream(e.to_string()));
                }
            }
            Some(Ok(ClientMessage::Ping(_) | ClientMessage::Pong(_))) => {}
            Some(Ok(ClientMessage::Close(_))) | None => {
                send_end_of_audio(&mut upstream_tx).await;
                break ClientLoopEnd::Disconnected;
            }
            Some(Err(e)) => {
                debug!("Client read error: {}", e);
                send_end_of_audio(&mut upstream_tx).await;
                break ClientLoopEnd::Disconnected;
            }
        }
    };

    ClientLoopOutcome {
        upstream_tx,
        end,
        frames,
        bytes,
    }
}

async fn forward_upstream_events<US, UE, CK>(
    mut upstream_rx: US,
    mut client_tx: CK,
) -> UpstreamLoopOutcome<CK>
where
    US: Stream<Item = Result<UpstreamMessage, UE>> + Unpin,
    UE: fmt::Display,
    CK: Sink<ClientMessage> + Unpin,
    CK::Error: fmt::Display,
{
    let mut events = 0;
    let mut error_reported = false;

    let end = loop {
        match upstream_rx.next().await {
            Some(Ok(UpstreamMessage::Text(text))) => {
                let text = text.as_str();
                let finished = is_finished_event(text);
                let is_error = is_error_event(text);
                if let Err(e) = client_tx.send(ClientMessage::Text(text.to_owned().into())).await {
                    debug!("Failed to forward event to client: {}", e);
                    break UpstreamLoopEnd::ClientGone;
                }
                events += 1;
                if is_error {
                    warn!("Transcription service reported an error: {}", text);
                    error_reported = true;
                }
                if finished {
                    break UpstreamLoopEnd::Finished;
                }
            }
            Some(Ok(UpstreamMessage::Binary(data))) => {
                if let Err(e) = client_tx.send(ClientMessage::Binary(data)).await {
                    debug!("Failed to forward binary frame to client: {}", e);
                    break UpstreamLoopEnd::ClientGone;
                }
                events += 1;
            }
            Some(Ok(UpstreamMessage::Close(_))) | None => {
                if !error_reported {
                    error_reported = send_error_event(&mut client_tx, &RelayError::UpstreamClosed).await;
                }
                break UpstreamLoopEnd::Closed;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                let error = RelayError::Upstream(e.to_string());
                warn!("{}", error);
                if !error_reported {
                    error_reported = send_error_event(&mut client_tx, &error).await;
                }
                break UpstreamLoopEnd::Failed;
            }
        }
    };

    UpstreamLoopOutcome {
        client_tx,
        end,
        events,
        error_reported,
    }
}

fn is_error_event(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .map(|event| {
            ["error_code", "error_message", "error"]
                .iter()
                .any(|key| event.get(key).is_some_and(|v| !v.is_null()))
        })
        .unwrap_or(false)
}

async fn send_end_of_audio<UK>(upstream_tx: &mut UK)
where
    UK: Sink<UpstreamMessage> + Unpin,
    UK::Error: fmt::Display,
{
    if let Err(e) = upstream_tx.send(UpstreamMessage::Binary(Bytes::new())).await {
        debug!("Could not send end of audio upstream: {}", e);
    }
}

async fn send_error_event<CK>(client_tx: &mut CK, error: &RelayError) -> bool
where
    CK: Sink<ClientMessage> + Unpin,
    CK::Error: fmt::Display,
{
    let payload = error.to_event().to_string();
    match client_tx.send(ClientMessage::Text(payload.into())).await {
        Ok(()) => true,
        Err(e) => {
            debug!("Could not deliver error event: {}", e);
            false
        }
    }
}

/// Close a sink, consuming it so it cannot be closed twice.
async fn close_sink<K, M>(mut sink: K, side: &'static str)
where
    K: Sink<M> + Unpin,
    K::Error: fmt::Display,
{
    if let Err(e) = sink.close().await {
        debug!(side, "Close failed: {}", e);
    }
}

async fn reject<CK>(mut client_tx: CK, error: RelayError) -> SessionSummary
where
    CK: Sink<ClientMessage> + Unpin,
    CK::Error: fmt::Display,
{
    warn!("Rejecting relay session: {}", error);
    let error_reported = send_error_event(&mut client_tx, &error).await;
    close_sink(client_tx, "client").await;
    SessionSummary {
        error_reported,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::{UnboundedSender, unbounded};
    use std::convert::Infallible;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    /// Sink that records items and counts close calls.
    struct RecordingSink<T> {
        items: Arc<Mutex<Vec<T>>>,
        closes: Arc<AtomicUsize>,
    }

    impl<T> Clone for RecordingSink<T> {
        fn clone(&self) -> Self {
            Self {
                items: Arc::clone(&self.items),
                closes: Arc::clone(&self.closes),
            }
        }
    }

    impl<T: Clone> RecordingSink<T> {
        fn new() -> Self {
            Self {
                items: Arc::new(Mutex::new(Vec::new())),
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn items(&self) -> Vec<T> {
            self.items.lock().unwrap().clone()
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl<T> Sink<T> for RecordingSink<T> {
        type Error = Infallible;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: T) -> Result<(), Self::Error> {
            self.items.lock().unwrap().push(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Poll::Ready(Ok(()))
        }
    }

    type ClientIn = UnboundedSender<Result<ClientMessage, String>>;
    type UpstreamIn = UnboundedSender<Result<UpstreamMessage, String>>;

    struct Harness {
        client_in: ClientIn,
        upstream_in: UpstreamIn,
        client_out: RecordingSink<ClientMessage>,
        upstream_out: RecordingSink<UpstreamMessage>,
        session: tokio::task::JoinHandle<SessionSummary>,
    }

    fn start_session() -> Harness {
        let (client_in, client_rx) = unbounded();
        let (upstream_in, upstream_rx) = unbounded();
        let client_out = RecordingSink::new();
        let upstream_out = RecordingSink::new();
        let session = tokio::spawn(pump_session(
            client_rx,
            client_out.clone(),
            upstream_rx,
            upstream_out.clone(),
        ));
        Harness {
            client_in,
            upstream_in,
            client_out,
            upstream_out,
            session,
        }
    }

    async fn wait_for<T: Clone>(sink: &RecordingSink<T>, count: usize) {
        for _ in 0..200 {
            if sink.items().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("sink never received {count} items");
    }

    fn binary(data: &'static [u8]) -> ClientMessage {
        ClientMessage::Binary(Bytes::from_static(data))
    }

    fn client_msg(text: &str) -> ClientMessage {
        ClientMessage::Text(text.to_string().into())
    }

    fn upstream_text(value: Value) -> UpstreamMessage {
        UpstreamMessage::Text(value.to_string().into())
    }

    fn client_text(item: &ClientMessage) -> Value {
        match item {
            ClientMessage::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    // =========================================================================
    // Client direction
    // =========================================================================

    #[tokio::test]
    async fn test_end_of_audio_stops_client_loop() {
        let (client_in, client_rx) = unbounded::<Result<ClientMessage, String>>();
        client_in.unbounded_send(Ok(binary(b"abc"))).unwrap();
        client_in.unbounded_send(Ok(binary(b""))).unwrap();
        client_in.unbounded_send(Ok(binary(b"late"))).unwrap();

        let sink = RecordingSink::new();
        let (_stop_tx, stop_rx) = oneshot::channel();
        let outcome = forward_client_audio(client_rx, sink.clone(), stop_rx).await;

        assert!(matches!(outcome.end, ClientLoopEnd::EndOfAudio));
        assert_eq!(outcome.frames, 1);
        assert_eq!(outcome.bytes, 3);
        assert_eq!(
            sink.items(),
            vec![
                UpstreamMessage::Binary(Bytes::from_static(b"abc")),
                UpstreamMessage::Binary(Bytes::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_client_disconnect_sends_end_of_audio() {
        let (client_in, client_rx) = unbounded::<Result<ClientMessage, String>>();
        client_in.unbounded_send(Ok(binary(b"abc"))).unwrap();
        drop(client_in);

        let sink = RecordingSink::new();
        let (_stop_tx, stop_rx) = oneshot::channel();
        let outcome = forward_client_audio(client_rx, sink.clone(), stop_rx).await;

        assert!(matches!(outcome.end, ClientLoopEnd::Disconnected));
        assert_eq!(sink.items().last(), Some(&UpstreamMessage::Binary(Bytes::new())));
    }

    #[tokio::test]
    async fn test_read_client_config_rejects_binary_and_missing_key() {
        let (client_in, mut client_rx) = unbounded::<Result<ClientMessage, String>>();
        client_in.unbounded_send(Ok(binary(b"audio"))).unwrap();
        let err = read_client_config(&mut client_rx, "stt-rt-v3").await.unwrap_err();
        assert!(matches!(err, RelayError::UnexpectedFrame("binary")));

        client_in
            .unbounded_send(Ok(client_msg(r#"{"model": "x"}"#)))
            .unwrap();
        let err = read_client_config(&mut client_rx, "stt-rt-v3").await.unwrap_err();
        assert!(matches!(err, RelayError::MissingApiKey));

        client_in
            .unbounded_send(Ok(client_msg(r#"{"api_key": "k"}"#)))
            .unwrap();
        let config = read_client_config(&mut client_rx, "stt-rt-v3").await.unwrap();
        assert_eq!(config.model, "stt-rt-v3");
    }

    // =========================================================================
    // Full session
    // =========================================================================

    #[tokio::test]
    async fn test_end_of_audio_keeps_results_flowing_until_finished() {
        let h = start_session();

        h.client_in.unbounded_send(Ok(binary(b"frame-1"))).unwrap();
        h.client_in.unbounded_send(Ok(binary(b""))).unwrap();
        wait_for(&h.upstream_out, 2).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!h.session.is_finished(), "session ended before upstream finished");

        h.upstream_in
            .unbounded_send(Ok(upstream_text(serde_json::json!({"tokens": [{"text": "hi"}]}))))
            .unwrap();
        h.upstream_in
            .unbounded_send(Ok(upstream_text(serde_json::json!({"tokens": [], "finished": true}))))
            .unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(2), h.session)
            .await
            .unwrap()
            .unwrap();
        assert!(summary.finished);
        assert!(!summary.error_reported);
        assert_eq!(summary.frames_forwarded, 1);
        assert_eq!(summary.events_forwarded, 2);

        let delivered = h.client_out.items();
        assert_eq!(delivered.len(), 2);
        assert_eq!(client_text(&delivered[1])["finished"], true);

        assert_eq!(h.upstream_out.closes(), 1);
        assert_eq!(h.client_out.closes(), 1);
    }

    #[tokio::test]
    async fn test_finished_ends_session_while_client_is_idle() {
        let h = start_session();
        h.upstream_in
            .unbounded_send(Ok(upstream_text(serde_json::json!({"tokens": [], "finished": true}))))
            .unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(2), h.session)
            .await
            .unwrap()
            .unwrap();
        assert!(summary.finished);
        assert_eq!(h.upstream_out.closes(), 1);
        assert_eq!(h.client_out.closes(), 1);
        drop(h.client_in);
    }

    #[tokio::test]
    async fn test_both_loops_ending_together_close_each_socket_once() {
        let (client_in, client_rx) = unbounded::<Result<ClientMessage, String>>();
        let (upstream_in, upstream_rx) = unbounded::<Result<UpstreamMessage, String>>();
        // Both terminators are queued before either loop runs
        client_in.unbounded_send(Ok(binary(b""))).unwrap();
        upstream_in
            .unbounded_send(Ok(upstream_text(serde_json::json!({"tokens": [], "finished": true}))))
            .unwrap();

        let client_out = RecordingSink::new();
        let upstream_out = RecordingSink::new();
        let summary = tokio::time::timeout(
            Duration::from_secs(2),
            pump_session(client_rx, client_out.clone(), upstream_rx, upstream_out.clone()),
        )
        .await
        .unwrap();

        assert!(summary.finished);
        assert!(!summary.error_reported);
        assert_eq!(client_out.closes(), 1);
        assert_eq!(upstream_out.closes(), 1);
        drop((client_in, upstream_in));
    }

    #[tokio::test]
    async fn test_upstream_close_reports_one_error() {
        let h = start_session();
        h.upstream_in.unbounded_send(Ok(UpstreamMessage::Close(None))).unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(2), h.session)
            .await
            .unwrap()
            .unwrap();
        assert!(!summary.finished);
        assert!(summary.error_reported);

        let delivered = h.client_out.items();
        assert_eq!(delivered.len(), 1);
        assert_eq!(client_text(&delivered[0])["error_code"], 502);
        assert_eq!(h.client_out.closes(), 1);
        assert_eq!(h.upstream_out.closes(), 1);
        drop(h.client_in);
    }

    #[tokio::test]
    async fn test_upstream_error_event_is_not_duplicated() {
        let h = start_session();
        h.upstream_in
            .unbounded_send(Ok(upstream_text(serde_json::json!({
                "tokens": [],
                "error_code": 401,
                "error_message": "Invalid API key"
            }))))
            .unwrap();
        drop(h.upstream_in);

        let summary = tokio::time::timeout(Duration::from_secs(2), h.session)
            .await
            .unwrap()
            .unwrap();
        assert!(summary.error_reported);

        let delivered = h.client_out.items();
        assert_eq!(delivered.len(), 1);
        assert_eq!(client_text(&delivered[0])["error_code"], 401);
        drop(h.client_in);
    }

    #[tokio::test]
    async fn test_serve_without_api_key_never_connects() {
        // Nothing listens on this port; reaching connect would produce a 502.
        let relay = RealtimeRelay::new("ws://127.0.0.1:1/transcribe", "stt-rt-v3");
        let (client_in, client_rx) = unbounded::<Result<ClientMessage, String>>();
        client_in
            .unbounded_send(Ok(client_msg(r#"{"model": "stt-rt-v3"}"#)))
            .unwrap();
        let client_out = RecordingSink::new();

        let summary = relay.serve(client_rx, client_out.clone()).await;
        assert!(summary.error_reported);

        let delivered = client_out.items();
        assert_eq!(delivered.len(), 1);
        assert_eq!(client_text(&delivered[0])["error_code"], 400);
        assert_eq!(client_out.closes(), 1);
    }

    #[tokio::test]
    async fn test_serve_config_timeout() {
        let relay = RealtimeRelay::new("ws://127.0.0.1:1/transcribe", "stt-rt-v3")
            .with_config_timeout(Duration::from_millis(20));
        let (_client_in, client_rx) = unbounded::<Result<ClientMessage, String>>();
        let client_out = RecordingSink::new();

        let summary = relay.serve(client_rx, client_out.clone()).await;
        assert!(summary.error_reported);
        assert_eq!(client_text(&client_out.items()[0])["error_code"], 408);
    }
}
