//! # procman
//!
//! Process registry and lifecycle management for multi-tenant workspace
//! sessions: spawning subprocesses on behalf of remote clients, indexing
//! them by pid, streaming their output as typed events, querying live
//! status, killing, and draining all children before a session shuts down.
//!
//! ## Features
//!
//! - **Process Registry**: per-session, in-memory map of every tracked
//!   subprocess, keyed internally by a monotonic run id so OS pid reuse is
//!   harmless
//! - **Lifecycle Manager**: spawn → register → forward events → kill/exit,
//!   with deliberately lazy purging of dead entries on status queries
//! - **Event Forwarder**: `<type>-start` / `<type>-data` / `<type>-exit`
//!   messages per process, each stamped with the pid and the caller's
//!   original run options
//! - **Shutdown Drainer**: confirmed drain (poll until empty) and
//!   best-effort immediate teardown, both available
//! - **Pluggable seams**: the spawning service and the message sink are
//!   traits; an OS spawner over `tokio::process` and a channel-backed sink
//!   ship in the box
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use procman::messages::BufferedSink;
//! use procman::session::Session;
//! use procman::spawn::OsSpawner;
//!
//! #[tokio::main]
//! async fn main() -> procman::Result<()> {
//!     let (sink, mut events) = BufferedSink::channel(64);
//!     let session = Session::new(Arc::new(OsSpawner::new()), Arc::new(sink));
//!
//!     // {"type":"shell"} namespaces the events: shell-start, shell-data,
//!     // shell-exit.
//!     session
//!         .handle_run(serde_json::json!({ "line": "echo hi", "type": "shell" }))
//!         .await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{event}");
//!         if event["type"] == "shell-exit" {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod core;
pub mod error;
pub mod messages;
pub mod options;
pub mod prelude;
pub mod process;
pub mod result;
pub mod session;
pub mod spawn;

pub use crate::core::{Pid, RunId, SessionId};
pub use error::{Error, SpawnError};
pub use messages::{BufferedSink, MessageSink};
pub use options::RunOptions;
pub use process::{DrainConfig, DrainOutcome, ProcessManager, ProcessRegistry, RunningProcess};
pub use result::Result;
pub use session::Session;
pub use spawn::{OsSpawner, ProcessHandle, Spawner};
