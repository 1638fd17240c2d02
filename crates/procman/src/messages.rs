//! Wire messages forwarded to the session's message sink.
//!
//! Every outbound event carries the fixed `command` label, the pid of the
//! process it concerns, and the original [`RunOptions`] echoed as `extra`.
//! Event names for process output are namespaced by the caller's run type:
//! a process spawned with `type: "shell"` produces `shell-start`,
//! `shell-data`, and `shell-exit` events.
//!
//! The [`MessageSink`] trait is the boundary to the transport that ships
//! events back to remote clients; [`BufferedSink`] is a channel-backed
//! implementation suitable for embedding and tests.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::core::Pid;
use crate::options::RunOptions;
use crate::{Error, Result};

/// Fixed command label attached to every outbound event.
pub const COMMAND_RUN: &str = "run";

/// Which output stream a data chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl OutputStream {
    /// Wire name of the stream.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// A lifecycle occurrence forwarded for a single process.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// The process has been spawned and its output subscribed. Sent one
    /// scheduling opportunity after subscription; on the wire this is a
    /// best-effort ordering hint, not a guarantee that no data precedes it.
    Start,
    /// A chunk of process output.
    Data {
        /// Stream the chunk arrived on.
        stream: OutputStream,
        /// Chunk contents, lossily decoded as UTF-8.
        data: String,
    },
    /// The process exited.
    Exit {
        /// Exit code, `-1` when terminated by a signal or unknown.
        code: i32,
    },
}

impl ProcessEvent {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Data { .. } => "data",
            Self::Exit { .. } => "exit",
        }
    }
}

/// Per-process metadata stamped onto every forwarded event.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Pid the events concern. Captured at spawn time so exit events still
    /// name the process after the live pid field has been cleared.
    pub pid: Pid,
    /// The caller's original run options, echoed verbatim.
    pub extra: RunOptions,
}

/// One row of a `processlist` snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessListEntry {
    /// Pid of the entry; `0` for an exited process not yet purged.
    pub pid: u32,
    /// The run options the entry was spawned with.
    #[serde(rename = "ideRun")]
    pub ide_run: RunOptions,
}

fn envelope(event_type: String, meta: Option<&EventMeta>) -> Map<String, Value> {
    let mut msg = Map::new();
    msg.insert("type".into(), Value::String(event_type));
    msg.insert("command".into(), Value::String(COMMAND_RUN.into()));
    if let Some(meta) = meta {
        msg.insert("pid".into(), Value::from(meta.pid.as_u32()));
        msg.insert(
            "extra".into(),
            serde_json::to_value(&meta.extra).unwrap_or(Value::Null),
        );
    }
    msg
}

/// Render a process event as its wire message.
pub fn process_event(run_type: &str, event: &ProcessEvent, meta: &EventMeta) -> Value {
    let mut msg = envelope(format!("{}-{}", run_type, event.suffix()), Some(meta));
    match event {
        ProcessEvent::Start => {}
        ProcessEvent::Data { stream, data } => {
            msg.insert("stream".into(), Value::String(stream.as_str().into()));
            msg.insert("data".into(), Value::String(data.clone()));
        }
        ProcessEvent::Exit { code } => {
            msg.insert("code".into(), Value::from(*code));
        }
    }
    Value::Object(msg)
}

/// Render a `processlist` snapshot as its wire message.
///
/// `origin` is the process whose registry mutation triggered the snapshot,
/// when there is one; administrative snapshots carry no pid or extra.
pub fn processlist_event(
    subtype: &str,
    entries: &[ProcessListEntry],
    origin: Option<&EventMeta>,
) -> Value {
    let mut msg = envelope("processlist".into(), origin);
    msg.insert("subtype".into(), Value::String(subtype.into()));
    msg.insert(
        "list".into(),
        serde_json::to_value(entries).unwrap_or(Value::Null),
    );
    Value::Object(msg)
}

/// Render a failure as a structured error event the client can correlate
/// with its original request via `uniqueId`.
pub fn error_event(err: &Error, unique_id: Option<&str>) -> Value {
    let mut msg = Map::new();
    msg.insert("type".into(), Value::String("error".into()));
    msg.insert("command".into(), Value::String(COMMAND_RUN.into()));
    msg.insert("err".into(), Value::String(err.to_string()));
    if let Some(unique_id) = unique_id {
        msg.insert("uniqueId".into(), Value::String(unique_id.into()));
    }
    Value::Object(msg)
}

/// Boundary to the transport that delivers events to the session's clients.
///
/// Implementations must tolerate concurrent senders; the lifecycle manager
/// and every event forwarder task share one sink per session.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one outbound message.
    async fn send(&self, message: Value) -> Result<()>;
}

/// Channel-backed [`MessageSink`] with a bounded buffer.
///
/// # Examples
///
/// ```rust
/// use procman::messages::{BufferedSink, MessageSink};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> procman::Result<()> {
/// let (sink, mut rx) = BufferedSink::channel(16);
/// sink.send(serde_json::json!({ "type": "processlist" })).await?;
/// let msg = rx.recv().await.expect("message");
/// assert_eq!(msg["type"], "processlist");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BufferedSink {
    tx: mpsc::Sender<Value>,
}

impl BufferedSink {
    /// Create a sink and the receiver draining it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Value>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessageSink for BufferedSink {
    async fn send(&self, message: Value) -> Result<()> {
        self.tx.send(message).await.map_err(|_| Error::SinkClosed)
    }
}
