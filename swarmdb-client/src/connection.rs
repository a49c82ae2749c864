//! Connection management.
//!
//! A [`Transport`] owns one WebSocket to a swarm node. The socket itself lives
//! in a background task; the transport talks to it through a queue of outgoing
//! messages and a shutdown signal, and observes it through a watch channel
//! holding the [`ReadyState`].

use crate::config::ConnectionConfig;
use crate::diagnostics::{DiagnosticSink, Diagnostics, TracingSink};
use crate::error::ClientError;
use crate::synthesize;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch, Notify};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::Message;

/// Lifecycle of a transport. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Socket created, handshake not yet complete.
    Connecting,
    /// Handshake complete, sends go to the wire.
    Open,
    /// Close requested, socket not yet torn down.
    Closing,
    /// Socket gone, either by request or because the connection failed.
    Closed,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyState::Connecting => write!(f, "CONNECTING"),
            ReadyState::Open => write!(f, "OPEN"),
            ReadyState::Closing => write!(f, "CLOSING"),
            ReadyState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Callback receiving every inbound envelope, whether it came from the node or
/// was synthesized locally.
pub type MessageHandler = Arc<dyn Fn(Bytes) + Send + Sync>;

/// A single-use WebSocket transport to a swarm node.
///
/// Reconnecting means building a new transport.
pub struct Transport {
    endpoint: String,
    state: Arc<watch::Sender<ReadyState>>,
    /// Messages waiting for the socket task.
    outgoing: mpsc::UnboundedSender<Bytes>,
    shutdown: Arc<Notify>,
    on_incoming: MessageHandler,
    /// Present only when a sink is configured.
    diagnostics: Option<Diagnostics>,
}

impl Transport {
    /// Starts connecting to `config.endpoint` and returns immediately.
    ///
    /// Fails only when the endpoint is not a `ws://` or `wss://` URL with a
    /// host. Connection failures are reported by the state moving to
    /// [`ReadyState::Closed`]. When `sink` is `None` and
    /// `config.trace_traffic` is set, traffic is traced through
    /// [`TracingSink`].
    ///
    /// Returns [`ClientError::NoRuntime`] when called outside a tokio runtime.
    pub fn connect<F>(
        config: &ConnectionConfig,
        on_incoming: F,
        sink: Option<Arc<dyn DiagnosticSink>>,
    ) -> Result<Self, ClientError>
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        let request = parse_endpoint(&config.endpoint)?;
        let runtime = Handle::try_current().map_err(|e| ClientError::NoRuntime(e.to_string()))?;
        install_crypto_provider();

        let sink = sink.or_else(|| {
            config
                .trace_traffic
                .then(|| Arc::new(TracingSink) as Arc<dyn DiagnosticSink>)
        });
        let diagnostics = sink.map(|sink| Diagnostics::spawn(&runtime, sink));

        let on_incoming: MessageHandler = Arc::new(on_incoming);
        let (state, _) = watch::channel(ReadyState::Connecting);
        let state = Arc::new(state);
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());

        tracing::debug!("Connecting to {}...", config.endpoint);
        let task = SocketTask {
            endpoint: config.endpoint.clone(),
            request,
            connect_timeout: config.connect_timeout(),
            state: state.clone(),
            shutdown: shutdown.clone(),
            on_incoming: on_incoming.clone(),
            diagnostics: diagnostics.clone(),
            outgoing: outgoing_rx,
        };
        runtime.spawn(task.run());

        Ok(Self {
            endpoint: config.endpoint.clone(),
            state,
            outgoing,
            shutdown,
            on_incoming,
            diagnostics,
        })
    }

    /// Sends an encoded envelope.
    ///
    /// While open, the bytes go to the socket unchanged. Otherwise a
    /// `database_msg` is answered at once through the inbound handler with a
    /// `CONNECTION NOT OPEN` error, and any other kind is dropped. Returns an
    /// error only when the socket is not open and the bytes are not a valid
    /// envelope.
    pub fn send(&self, bytes: impl Into<Bytes>) -> Result<(), ClientError> {
        let bytes = bytes.into();

        if self.is_open() && self.outgoing.send(bytes.clone()).is_ok() {
            if let Some(diagnostics) = &self.diagnostics {
                diagnostics.outgoing(bytes);
            }
            return Ok(());
        }

        let state = self.ready_state();
        match synthesize::connection_not_open(&bytes) {
            Ok(response) => {
                tracing::debug!("Transport {}, answering database_msg locally", state);
                (self.on_incoming)(response);
                Ok(())
            }
            Err(ClientError::UnexpectedPayload(kind)) => {
                // Status polling is best effort: nothing is reported back.
                tracing::debug!("Transport {}, dropping {}", state, kind);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Closes the transport. Calling it again has no effect.
    pub fn close(&self) {
        let closing = self.state.send_if_modified(|state| match *state {
            ReadyState::Connecting | ReadyState::Open => {
                *state = ReadyState::Closing;
                true
            }
            ReadyState::Closing | ReadyState::Closed => false,
        });

        if closing {
            tracing::debug!("Closing connection to {}...", self.endpoint);
            self.shutdown.notify_one();
        }
    }

    /// Returns the current state.
    pub fn ready_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    /// Returns whether sends currently go to the wire.
    pub fn is_open(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Returns the endpoint this transport connects to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Waits until the handshake has either completed or failed.
    pub async fn wait_ready(&self) -> ReadyState {
        self.wait_until(|state| *state != ReadyState::Connecting).await
    }

    /// Waits until the socket is gone.
    pub async fn closed(&self) {
        self.wait_until(|state| *state == ReadyState::Closed).await;
    }

    async fn wait_until(&self, condition: impl FnMut(&ReadyState) -> bool) -> ReadyState {
        let mut rx = self.state.subscribe();
        let reached = rx.wait_for(condition).await.map(|state| *state);
        reached.unwrap_or_else(|_| self.ready_state())
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.endpoint)
            .field("state", &self.ready_state())
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

/// Selects the process-wide rustls provider used for `wss://` handshakes.
///
/// A provider installed earlier by the application is left in place.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Checks that `endpoint` is a WebSocket URL and builds the handshake request.
fn parse_endpoint(endpoint: &str) -> Result<Request, ClientError> {
    let invalid = |reason: String| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let request = endpoint
        .into_client_request()
        .map_err(|e| invalid(e.to_string()))?;

    match request.uri().scheme_str() {
        Some("ws") | Some("wss") => {}
        Some(other) => return Err(invalid(format!("unsupported scheme {:?}", other))),
        None => return Err(invalid("missing ws:// or wss:// scheme".to_string())),
    }

    if request.uri().host().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    Ok(request)
}

/// Background task owning the socket.
struct SocketTask {
    endpoint: String,
    request: Request,
    connect_timeout: Duration,
    state: Arc<watch::Sender<ReadyState>>,
    shutdown: Arc<Notify>,
    on_incoming: MessageHandler,
    diagnostics: Option<Diagnostics>,
    outgoing: mpsc::UnboundedReceiver<Bytes>,
}

impl SocketTask {
    async fn run(self) {
        let SocketTask {
            endpoint,
            request,
            connect_timeout,
            state,
            shutdown,
            on_incoming,
            diagnostics,
            mut outgoing,
        } = self;
        let _closed = CloseOnDrop {
            state: state.clone(),
            endpoint: endpoint.clone(),
        };

        let connect = tokio::time::timeout(connect_timeout, connect_async(request));
        let stream = tokio::select! {
            _ = shutdown.notified() => {
                tracing::debug!("Closed before connection to {} completed", endpoint);
                return;
            }
            result = connect => match result {
                Ok(Ok((stream, _))) => stream,
                Ok(Err(e)) => {
                    tracing::warn!("Connection to {} failed: {}", endpoint, e);
                    return;
                }
                Err(_) => {
                    tracing::warn!("Connection to {} timed out", endpoint);
                    return;
                }
            }
        };

        // close() may have run while the handshake was finishing.
        let opened = state.send_if_modified(|state| {
            if *state == ReadyState::Connecting {
                *state = ReadyState::Open;
                true
            } else {
                false
            }
        });

        let (mut sink, mut stream) = stream.split();

        if !opened {
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
        tracing::debug!("Connected to {}", endpoint);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        tracing::debug!("Close frame to {} not sent: {}", endpoint, e);
                    }
                    break;
                }
                bytes = outgoing.recv() => match bytes {
                    Some(bytes) => {
                        tracing::trace!("Sending {} bytes to {}", bytes.len(), endpoint);
                        if let Err(e) = sink.send(Message::Binary(bytes)).await {
                            tracing::warn!("Write to {} failed: {}", endpoint, e);
                            break;
                        }
                    }
                    None => break,
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Binary(bytes))) => {
                        tracing::trace!("Received {} bytes from {}", bytes.len(), endpoint);
                        on_incoming(bytes.clone());
                        if let Some(diagnostics) = &diagnostics {
                            diagnostics.incoming(bytes);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!("Connection to {} closed by remote: {:?}", endpoint, frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("Read from {} failed: {}", endpoint, e);
                        break;
                    }
                    None => {
                        tracing::debug!("Connection to {} ended", endpoint);
                        break;
                    }
                },
            }
        }
    }
}

/// Moves the transport to `Closed` however the socket task ends, including
/// by unwinding out of the inbound handler.
struct CloseOnDrop {
    state: Arc<watch::Sender<ReadyState>>,
    endpoint: String,
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.state.send_replace(ReadyState::Closed);
        tracing::debug!("Connection to {} closed", self.endpoint);
    }
}
