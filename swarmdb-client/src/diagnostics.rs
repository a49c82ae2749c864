//! Deferred tracing of transport traffic.
//!
//! The transport hands raw bytes to a [`Diagnostics`] handle after it has
//! already forwarded or delivered them. A worker task decodes the bytes and
//! calls the [`DiagnosticSink`], so a slow or panicking sink never touches the
//! send/receive path.

use bytes::Bytes;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use swarmdb_protocol::{Payload, PayloadKind};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Receives human-readable traffic traces.
pub trait DiagnosticSink: Send + Sync + 'static {
    /// Called with a label such as `"Outgoing database_msg"` and the decoded
    /// inner message, with unset fields removed.
    fn trace(&self, label: &str, payload: &Value);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str, &Value) + Send + Sync + 'static,
{
    fn trace(&self, label: &str, payload: &Value) {
        self(label, payload)
    }
}

/// Sink that emits traces as `tracing` info events on `swarmdb::traffic`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn trace(&self, label: &str, payload: &Value) {
        tracing::info!(target: "swarmdb::traffic", "{}\n{}", label, payload);
    }
}

/// Direction of a traced message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl Direction {
    fn label(&self) -> &'static str {
        match self {
            Direction::Outgoing => "Outgoing",
            Direction::Incoming => "Incoming",
        }
    }

    /// Whether `kind` is expected to travel in this direction.
    fn carries(&self, kind: PayloadKind) -> bool {
        match self {
            Direction::Outgoing => kind.is_request(),
            Direction::Incoming => !kind.is_request(),
        }
    }
}

struct Traffic {
    direction: Direction,
    bytes: Bytes,
}

/// Handle for scheduling traces. Cloned into the socket task.
#[derive(Clone)]
pub(crate) struct Diagnostics {
    tx: mpsc::UnboundedSender<Traffic>,
}

impl Diagnostics {
    /// Spawns the worker that drains traces into `sink`.
    ///
    /// The worker runs until every handle is dropped and the queue is empty,
    /// so traces scheduled before a close are still delivered.
    pub(crate) fn spawn(runtime: &Handle, sink: Arc<dyn DiagnosticSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_worker(sink, rx));
        Self { tx }
    }

    pub(crate) fn outgoing(&self, bytes: Bytes) {
        self.schedule(Direction::Outgoing, bytes);
    }

    pub(crate) fn incoming(&self, bytes: Bytes) {
        self.schedule(Direction::Incoming, bytes);
    }

    fn schedule(&self, direction: Direction, bytes: Bytes) {
        if self.tx.send(Traffic { direction, bytes }).is_err() {
            tracing::debug!("diagnostics worker gone, dropping {:?} trace", direction);
        }
    }
}

async fn run_worker(sink: Arc<dyn DiagnosticSink>, mut rx: mpsc::UnboundedReceiver<Traffic>) {
    while let Some(traffic) = rx.recv().await {
        let Some((label, payload)) = render(traffic.direction, &traffic.bytes) else {
            continue;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.trace(&label, &payload)));
        if outcome.is_err() {
            tracing::warn!("diagnostic sink panicked while tracing {}", label);
        }
    }
    tracing::debug!("diagnostics worker stopped");
}

/// Decodes traced bytes into a label and a JSON view of the inner message.
///
/// Returns `None` (after logging) for bytes that are not a well-formed
/// envelope of the kind expected in `direction`.
pub fn render(direction: Direction, bytes: &[u8]) -> Option<(String, Value)> {
    let envelope = match swarmdb_protocol::decode(bytes) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!("cannot trace {:?} message: {}", direction, e);
            return None;
        }
    };

    let kind = envelope.kind();
    if !direction.carries(kind) {
        tracing::error!("unexpected {} in {:?} traffic", kind, direction);
        return None;
    }

    let value = match &envelope.payload {
        Payload::DatabaseMsg(msg) => serde_json::to_value(msg),
        Payload::DatabaseResponse(response) => serde_json::to_value(response),
        Payload::StatusRequest(request) => serde_json::to_value(request),
        Payload::StatusResponse(response) => serde_json::to_value(response),
    };

    match value {
        Ok(value) => Some((format!("{} {}", direction.label(), kind), strip_nulls(value))),
        Err(e) => {
            tracing::error!("cannot render {} for tracing: {}", kind, e);
            None
        }
    }
}

/// Removes object entries with no value, recursively.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
