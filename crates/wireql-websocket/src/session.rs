//! The subscription session state machine.
//!
//! One session drives one `graphql-ws` connection through
//! `Idle → Connecting → AckPending → Active → (Complete | Failed) → Closed`.
//! A background reader task is the single consumer of the socket's read
//! half; it forwards decoded event payloads over an mpsc channel, which
//! preserves server emission order. A broadcast shutdown channel lets
//! [`SubscriptionSession::close`] interrupt the otherwise-blocking wait for
//! the next frame. The reader task releases the underlying connection on
//! every exit path.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{SplitSink, SplitStream, Stream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use uuid::Uuid;

use wireql_protocol::ws::{
    ClientMessage, Decoded, GRAPHQL_WS_PROTOCOL, ServerMessage, errors_from_payload,
};
use wireql_protocol::{ClientError, ExecutionError, ProtocolViolation, Request, TransportError};

use crate::config::SubscriptionConfig;

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// The lifecycle of a subscription session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection open.
    Idle,
    /// Socket handshake and sub-protocol negotiation in progress.
    Connecting,
    /// `connection_init` sent; waiting for the server's acknowledgement.
    AckPending,
    /// Subscribed; events flow.
    Active,
    /// The server ended the stream gracefully. Terminal.
    Complete,
    /// The session died on an error or protocol violation. Terminal.
    Failed,
    /// The caller cancelled the session. Terminal.
    Closed,
}

impl SessionState {
    /// Whether the session can make no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Closed)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::AckPending => "ack-pending",
            Self::Active => "active",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

/// A live subscription: a single-use, forward-only stream of event payloads.
///
/// Each yielded element is the `data` sub-field of one inbound `data`
/// message, in server emission order. The stream ends when the server
/// completes the subscription, when it fails, or when the caller cancels
/// via [`close`](Self::close). Sessions are not restartable.
pub struct SubscriptionSession {
    session_id: String,
    subscription_id: String,
    state: Arc<RwLock<SessionState>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    events_rx: mpsc::Receiver<Result<Value, ClientError>>,
    shutdown_tx: broadcast::Sender<()>,
    reader_task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SubscriptionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionSession")
            .field("session_id", &self.session_id)
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

impl SubscriptionSession {
    /// Open a connection, perform the `graphql-ws` handshake, and start the
    /// subscription described by `request`.
    ///
    /// Establishment (socket handshake through acknowledgement) is bounded
    /// by `config.connect_timeout` when set; exceeding it fails the session
    /// with a timeout cause.
    ///
    /// # Errors
    ///
    /// [`TransportError`] for connection-level failures,
    /// [`ProtocolViolation`] if the server speaks out of turn before
    /// acknowledging.
    pub async fn connect(
        config: SubscriptionConfig,
        request: &Request,
    ) -> Result<Self, ClientError> {
        let session_id = Uuid::new_v4().to_string();
        let state = Arc::new(RwLock::new(SessionState::Idle));

        let established = match config.connect_timeout {
            Some(deadline) => {
                match tokio::time::timeout(
                    deadline,
                    Self::establish(&config, request, &session_id, &state),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout {
                        operation: "subscription connect".to_string(),
                        timeout: deadline,
                    }
                    .into()),
                }
            }
            None => Self::establish(&config, request, &session_id, &state).await,
        };

        let (writer, reader) = match established {
            Ok(halves) => halves,
            Err(e) => {
                // Dropping the half-established stream releases the socket.
                *state.write().await = SessionState::Failed;
                return Err(e);
            }
        };

        *state.write().await = SessionState::Active;
        debug!(%session_id, "subscription active");

        let writer = Arc::new(Mutex::new(Some(writer)));
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let reader_task = Self::spawn_reader(
            reader,
            Arc::clone(&writer),
            Arc::clone(&state),
            events_tx,
            shutdown_rx,
            config.subscription_id.clone(),
            session_id.clone(),
        );

        Ok(Self {
            session_id,
            subscription_id: config.subscription_id,
            state,
            writer,
            events_rx,
            shutdown_tx,
            reader_task: Some(reader_task),
        })
    }

    /// Await the next event payload.
    ///
    /// Returns `None` once the session has reached a terminal state and all
    /// buffered events have been drained.
    pub async fn next_event(&mut self) -> Option<Result<Value, ClientError>> {
        self.events_rx.recv().await
    }

    /// The current session state.
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// This session's id (diagnostic, not the wire subscription id).
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Cancel the subscription.
    ///
    /// Sends `stop` when the connection is still open, transitions to
    /// `Closed`, and releases the underlying connection. Safe to call in
    /// any state; a no-op once the session is terminal.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        if self.state.read().await.is_terminal() {
            return Ok(());
        }
        debug!(session_id = %self.session_id, "closing subscription session");

        if let Some(writer) = self.writer.lock().await.as_mut() {
            // Best effort; the connection may already be gone.
            let stop = ClientMessage::Stop {
                id: self.subscription_id.clone(),
            };
            if let Ok(frame) = stop.to_frame() {
                let _ = writer.send(Message::text(frame)).await;
                let _ = writer.flush().await;
            }
        }

        let _ = self.shutdown_tx.send(());
        // Unblock a reader stuck forwarding into a full event buffer.
        self.events_rx.close();
        *self.state.write().await = SessionState::Closed;

        if let Some(task) = self.reader_task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    async fn establish(
        config: &SubscriptionConfig,
        request: &Request,
        session_id: &str,
        state: &Arc<RwLock<SessionState>>,
    ) -> Result<(WsWriter, WsReader), ClientError> {
        *state.write().await = SessionState::Connecting;
        debug!(%session_id, url = %config.url, "opening subscription connection");

        let mut ws_request = config.url.as_str().into_client_request().map_err(|e| {
            TransportError::ConnectionFailed(format!("invalid url `{}`: {e}", config.url))
        })?;
        ws_request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(GRAPHQL_WS_PROTOCOL),
        );

        let (stream, _response) = connect_async(ws_request)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (mut writer, mut reader) = stream.split();

        send_frame(&mut writer, &ClientMessage::ConnectionInit).await?;
        *state.write().await = SessionState::AckPending;

        loop {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => match ServerMessage::decode(text.as_str())? {
                    Decoded::Message(ServerMessage::ConnectionAck) => break,
                    Decoded::Message(other) => {
                        return Err(ProtocolViolation::new(
                            SessionState::AckPending.name(),
                            other.type_name(),
                        )
                        .into());
                    }
                    Decoded::Unknown(kind) => {
                        return Err(
                            ProtocolViolation::new(SessionState::AckPending.name(), kind).into()
                        );
                    }
                },
                // WebSocket control frames live below the message protocol.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(TransportError::ConnectionLost(
                        "connection closed during handshake".to_string(),
                    )
                    .into());
                }
                Some(Ok(_)) => {
                    return Err(TransportError::MalformedResponse(
                        "unexpected non-text frame during handshake".to_string(),
                    )
                    .into());
                }
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(e.to_string()).into());
                }
            }
        }
        debug!(%session_id, "connection acknowledged");

        send_frame(
            &mut writer,
            &ClientMessage::start(config.subscription_id.as_str(), request),
        )
        .await?;
        Ok((writer, reader))
    }

    fn spawn_reader(
        mut reader: WsReader,
        writer: Arc<Mutex<Option<WsWriter>>>,
        state: Arc<RwLock<SessionState>>,
        events_tx: mpsc::Sender<Result<Value, ClientError>>,
        mut shutdown_rx: broadcast::Receiver<()>,
        subscription_id: String,
        session_id: String,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!(%session_id, "subscription reader task started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!(%session_id, "reader received shutdown signal");
                        break;
                    }
                    frame = reader.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                match route_frame(text.as_str(), &subscription_id) {
                                    Routed::Event(data) => {
                                        if events_tx.send(Ok(data)).await.is_err() {
                                            // Consumer went away; nothing left to deliver to.
                                            break;
                                        }
                                    }
                                    Routed::Ignored => {}
                                    Routed::Terminal { error, state: next } => {
                                        if let Some(error) = error {
                                            let _ = events_tx.send(Err(error)).await;
                                        }
                                        *state.write().await = next;
                                        break;
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Some(writer) = writer.lock().await.as_mut() {
                                    let _ = writer.send(Message::Pong(data)).await;
                                }
                            }
                            Some(Ok(Message::Pong(_))) => {}
                            Some(Ok(Message::Close(_))) | None => {
                                let _ = events_tx
                                    .send(Err(TransportError::ConnectionLost(
                                        "server closed the connection".to_string(),
                                    )
                                    .into()))
                                    .await;
                                *state.write().await = SessionState::Failed;
                                break;
                            }
                            Some(Ok(_)) => {
                                let _ = events_tx
                                    .send(Err(TransportError::MalformedResponse(
                                        "unexpected non-text frame".to_string(),
                                    )
                                    .into()))
                                    .await;
                                *state.write().await = SessionState::Failed;
                                break;
                            }
                            Some(Err(e)) => {
                                let _ = events_tx
                                    .send(Err(TransportError::ReceiveFailed(e.to_string()).into()))
                                    .await;
                                *state.write().await = SessionState::Failed;
                                break;
                            }
                        }
                    }
                }
            }
            // Release the connection on every exit path.
            if let Some(mut writer) = writer.lock().await.take() {
                let _ = writer.close().await;
            }
            debug!(%session_id, "subscription reader task terminated");
        })
    }
}

impl Stream for SubscriptionSession {
    type Item = Result<Value, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events_rx.poll_recv(cx)
    }
}

/// What the reader does with one decoded text frame while `Active`.
enum Routed {
    /// Yield this payload and stay `Active`.
    Event(Value),
    /// A frame for another subscription id; stay `Active`.
    Ignored,
    /// Surface `error` (if any) and enter the terminal `state`.
    Terminal {
        error: Option<ClientError>,
        state: SessionState,
    },
}

fn route_frame(frame: &str, subscription_id: &str) -> Routed {
    match ServerMessage::decode(frame) {
        Ok(Decoded::Message(ServerMessage::Data { id, payload })) => {
            if id == subscription_id {
                Routed::Event(payload.data)
            } else {
                warn!(%id, "ignoring data for unknown subscription id");
                Routed::Ignored
            }
        }
        Ok(Decoded::Message(ServerMessage::Error { id, payload })) => {
            if id != subscription_id {
                warn!(%id, "ignoring error for unknown subscription id");
                return Routed::Ignored;
            }
            Routed::Terminal {
                error: Some(
                    ExecutionError {
                        errors: errors_from_payload(payload),
                        partial_data: None,
                    }
                    .into(),
                ),
                state: SessionState::Failed,
            }
        }
        Ok(Decoded::Message(ServerMessage::Complete { id })) => {
            if id != subscription_id {
                return Routed::Ignored;
            }
            Routed::Terminal {
                error: None,
                state: SessionState::Complete,
            }
        }
        Ok(Decoded::Message(other @ ServerMessage::ConnectionAck)) => Routed::Terminal {
            error: Some(
                ProtocolViolation::new(SessionState::Active.name(), other.type_name()).into(),
            ),
            state: SessionState::Failed,
        },
        Ok(Decoded::Unknown(kind)) => Routed::Terminal {
            error: Some(ProtocolViolation::new(SessionState::Active.name(), kind).into()),
            state: SessionState::Failed,
        },
        Err(transport) => Routed::Terminal {
            error: Some(transport.into()),
            state: SessionState::Failed,
        },
    }
}

async fn send_frame(writer: &mut WsWriter, message: &ClientMessage) -> Result<(), TransportError> {
    let frame = message.to_frame()?;
    writer
        .send(Message::text(frame))
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))
}
