//! Error types for process spawning, lookup, and forwarding.
//!
//! # Error Hierarchy
//!
//! ```text
//! Error (top-level)
//! ├── Spawn(SpawnError)
//! ├── ProcessNotFound { pid }
//! ├── DebuggingUnsupported { pid }
//! ├── SinkClosed
//! └── Protocol(String)
//! ```
//!
//! None of these are fatal to the owning session: spawn failures are reported
//! to the caller and never retried automatically, and lookup failures on
//! already-purged pids are expected during normal operation.

use thiserror::Error;

use crate::core::Pid;

/// Top-level error type for process management operations.
///
/// # Conversions
///
/// Sub-error types convert automatically via `From`:
///
/// ```rust
/// use procman::error::{Error, SpawnError};
///
/// let spawn_error = SpawnError::MissingMetadata {
///     command: "echo hi".to_string(),
/// };
/// let error: Error = spawn_error.into();
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// The spawning service failed to produce a usable process.
    #[error("spawn error: {0}")]
    Spawn(#[from] SpawnError),

    /// A kill, debug, or query operation referenced a pid that is not in the
    /// registry (already exited and lazily purged, or never existed).
    #[error("no tracked process with pid {pid}")]
    ProcessNotFound {
        /// The pid that was looked up.
        pid: Pid,
    },

    /// A debug command was sent to a handle that lacks debug capability.
    #[error("process {pid} does not support debug commands")]
    DebuggingUnsupported {
        /// The pid of the non-debuggable process.
        pid: Pid,
    },

    /// The session's message sink is gone; events can no longer be delivered.
    #[error("message sink closed")]
    SinkClosed,

    /// Internal invariant violation (e.g. a poisoned registry lock) or a
    /// malformed inbound message.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Construct a protocol error from any displayable reason.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol(reason.into())
    }
}

/// Errors from the spawning-service boundary.
///
/// Both variants are surfaced to the caller as a failed spawn; neither is
/// retried automatically.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The spawning service reported an error creating the OS process.
    #[error("failed to spawn `{command}`: {reason}")]
    Failed {
        /// Command line that failed to spawn.
        command: String,
        /// Reason for failure.
        reason: String,
        /// Source error if available.
        #[source]
        source: Option<std::io::Error>,
    },

    /// The spawning service reported success but returned no usable process
    /// metadata (no pid). This is a protocol violation on the service's part
    /// and is treated as a spawn failure.
    #[error("spawner returned no process metadata for `{command}`")]
    MissingMetadata {
        /// Command line whose spawn produced no metadata.
        command: String,
    },
}
