//! Prelude module for convenient imports.

pub use crate::core::{Pid, RunId, SessionId};
pub use crate::error::{Error, SpawnError};
pub use crate::messages::{BufferedSink, MessageSink, OutputStream, ProcessEvent, ProcessListEntry};
pub use crate::options::RunOptions;
pub use crate::process::{DrainConfig, DrainOutcome, ProcessManager, ProcessRegistry, RunningProcess};
pub use crate::session::Session;
pub use crate::spawn::{OsSpawner, ProcessHandle, Spawner, StatusSnapshot};
pub use crate::Result;
