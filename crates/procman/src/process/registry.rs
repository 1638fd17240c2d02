//! In-memory registry of tracked processes.
//!
//! The registry is the single source of truth for "which processes are
//! currently known" within one session. Entries are keyed by the internal
//! monotonic [`RunId`] rather than the OS pid, because the OS may reuse a
//! pid after exit; iteration order is registration order.
//!
//! The registry is owned exclusively by the lifecycle manager. Removal is
//! deliberately lazy: entries stay until a status query observes them as no
//! longer running (see [`crate::process::ProcessManager::ps`]).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::core::{Pid, RunId};
use crate::options::RunOptions;
use crate::spawn::ProcessHandle;
use crate::Result;

/// A registered process: its handle plus the options it was spawned with.
#[derive(Clone)]
pub struct Registration {
    /// Internal logical id, unique for the registry's lifetime.
    pub run_id: RunId,
    /// Shared live-process handle.
    pub handle: Arc<dyn ProcessHandle>,
    /// The caller's original run options.
    pub options: RunOptions,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("run_id", &self.run_id)
            .field("pid", &self.handle.pid())
            .field("line", &self.options.line)
            .finish()
    }
}

/// Thread-safe mapping from [`RunId`] to [`Registration`].
///
/// All mutation goes through the lifecycle manager; a single mutex
/// serializes it. Reads return cloned registrations (handles are `Arc`s) so
/// the lock is never held across an await point.
pub struct ProcessRegistry {
    processes: Mutex<BTreeMap<RunId, Registration>>,
    next_id: AtomicU64,
}

impl ProcessRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            processes: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a spawned process, allocating its logical id.
    pub fn register(&self, handle: Arc<dyn ProcessHandle>, options: RunOptions) -> Result<RunId> {
        let run_id = RunId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let registration = Registration {
            run_id,
            handle,
            options,
        };
        let mut processes = self
            .processes
            .lock()
            .map_err(|e| crate::Error::protocol(format!("registry lock poisoned: {e}")))?;
        info!(%run_id, pid = ?registration.handle.pid(), "registered process");
        processes.insert(run_id, registration);
        Ok(run_id)
    }

    /// Look up a registration by logical id.
    pub fn get(&self, run_id: RunId) -> Option<Registration> {
        let processes = self.processes.lock().ok()?;
        processes.get(&run_id).cloned()
    }

    /// Look up the registration whose handle currently reports `pid`.
    ///
    /// Only matches live entries; an exited process has its pid cleared and
    /// can no longer be found this way.
    pub fn find_by_pid(&self, pid: Pid) -> Option<Registration> {
        let processes = self.processes.lock().ok()?;
        processes
            .values()
            .find(|reg| reg.handle.pid() == Some(pid))
            .cloned()
    }

    /// Remove a registration. Does not kill the process.
    pub fn remove(&self, run_id: RunId) -> Option<Registration> {
        let mut processes = self.processes.lock().ok()?;
        let removed = processes.remove(&run_id);
        if removed.is_some() {
            debug!(%run_id, "removed process from registry");
        }
        removed
    }

    /// All registrations in registration order.
    pub fn entries(&self) -> Vec<Registration> {
        self.processes
            .lock()
            .map(|processes| processes.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered processes (including exited-but-unpurged ones).
    pub fn len(&self) -> usize {
        self.processes.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}
