//! Spawning-service boundary.
//!
//! The core never creates OS processes itself; it depends on a [`Spawner`]
//! that turns a [`RunOptions`] into a live [`ProcessHandle`] plus its output
//! streams. [`os::OsSpawner`] is the shipped implementation over
//! `tokio::process`; tests substitute scripted fakes at the same seam.
//!
//! Debug capability is modeled as an explicitly queried port rather than
//! type inspection: a handle that supports debug commands returns `Some`
//! from [`ProcessHandle::debug_port`].

pub mod os;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::core::Pid;
use crate::error::SpawnError;
use crate::options::RunOptions;
use crate::Result;

pub use os::{OsProcess, OsSpawner};

/// Point-in-time status of a tracked process.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// The command line the process was spawned with.
    pub command: String,
    /// When the process was spawned.
    pub started_at: DateTime<Utc>,
    /// Milliseconds since spawn.
    pub uptime_ms: i64,
    /// Whether the process is still considered live.
    pub running: bool,
    /// Current pid; `None` once exited.
    pub pid: Option<Pid>,
    /// Whether a kill has been issued.
    pub killed: bool,
}

/// Readable output of a spawned process.
///
/// Taken exactly once by the event forwarder; the streams are not
/// re-subscribable.
pub struct OutputStreams {
    /// Standard output of the process.
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    /// Standard error of the process.
    pub stderr: Box<dyn AsyncRead + Send + Unpin>,
}

/// A successfully spawned process: its handle plus output streams.
pub struct Spawned {
    /// Shared handle used by the registry and the event forwarder.
    pub handle: Arc<dyn ProcessHandle>,
    /// Output streams, consumed by the event forwarder.
    pub output: OutputStreams,
}

/// Entry point for forwarding opaque debug instructions to a process that
/// supports them.
pub trait DebugPort: Send + Sync {
    /// Forward one debug payload.
    fn send(&self, payload: &serde_json::Value) -> Result<()>;
}

/// Live-process handle as produced by a [`Spawner`].
///
/// Mutation discipline: only the lifecycle manager (via kill) and the event
/// forwarder (on exit) may touch the `pid`/`killed` markers; everything else
/// treats the handle as read-only.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Current pid, or `None` once the process is no longer running.
    fn pid(&self) -> Option<Pid>;

    /// Clear the pid to the not-running sentinel. Called by the event
    /// forwarder before the exit event is sent, so a racing status query
    /// never reports an exited process as live.
    fn clear_pid(&self);

    /// Whether a kill has been issued for this process. Idempotent marker,
    /// independent of actual OS exit timing.
    fn killed(&self) -> bool;

    /// Set the kill marker.
    fn mark_killed(&self);

    /// Issue a forceful terminate signal. Best-effort; does not wait for
    /// OS-level termination.
    async fn kill(&self) -> Result<()>;

    /// Wait for the process to exit and return its exit code (`-1` when
    /// terminated by a signal or unknown).
    async fn wait(&self) -> i32;

    /// Produce a point-in-time status snapshot.
    fn describe(&self) -> StatusSnapshot;

    /// Debug capability, when the underlying process type supports it.
    fn debug_port(&self) -> Option<&dyn DebugPort> {
        None
    }
}

/// The process-spawning service contract.
///
/// Given run options, creates an OS-level process and returns its handle and
/// output streams. Errors are surfaced to the caller and never retried by
/// the core.
#[async_trait]
pub trait Spawner: Send + Sync {
    /// Spawn one process for `options.line`.
    async fn spawn(&self, options: &RunOptions) -> std::result::Result<Spawned, SpawnError>;
}
