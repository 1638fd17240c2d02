//! Process registry and lifecycle management.
//!
//! This is the core of the crate: an in-memory [`ProcessRegistry`] tracking
//! every subprocess a session has spawned, a [`ProcessManager`] that owns
//! it and enforces the state-transition rules, an event forwarder shipping
//! per-process output to the session's message sink, and the shutdown
//! drainer that blocks teardown until all children have actually
//! terminated.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use procman::core::SessionId;
//! use procman::messages::BufferedSink;
//! use procman::options::RunOptions;
//! use procman::process::{DrainConfig, ProcessManager};
//! use procman::spawn::OsSpawner;
//!
//! # #[tokio::main]
//! # async fn main() -> procman::Result<()> {
//! let (sink, _events) = BufferedSink::channel(64);
//! let manager = ProcessManager::new(
//!     SessionId::generate(),
//!     Arc::new(OsSpawner::new()),
//!     Arc::new(sink),
//! );
//!
//! let running = manager
//!     .spawn(RunOptions::builder("echo hi").run_type("shell").build())
//!     .await?;
//! println!("spawned pid {}", running.pid);
//!
//! manager.kill_all().await;
//! manager.prepare_shutdown(DrainConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod drain;
pub(crate) mod forwarder;
pub mod manager;
pub mod registry;

pub use drain::{DrainConfig, DrainOutcome};
pub use manager::{ProcessManager, RunningProcess};
pub use registry::{ProcessRegistry, Registration};
