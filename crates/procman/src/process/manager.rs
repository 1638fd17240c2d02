//! Lifecycle manager: spawn, query, kill, and debug operations.
//!
//! One [`ProcessManager`] exists per workspace session. It owns the
//! session's [`ProcessRegistry`] exclusively; no other component inserts or
//! deletes entries. The spawn path is
//! spawn → register → processlist broadcast → attach event forwarding,
//! and cleanup is lazy: dead entries are purged on the next [`ps`] call,
//! not when the exit event fires.
//!
//! One deviation from the usual event envelope: administrative
//! `processlist` snapshots requested via [`list_processes`] are not
//! triggered by any single process, so they carry no `pid` or `extra`
//! fields. Snapshots broadcast on a registry mutation stamp the
//! originating process as usual.
//!
//! [`ps`]: ProcessManager::ps
//! [`list_processes`]: ProcessManager::list_processes

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{Pid, RunId, SessionId};
use crate::error::SpawnError;
use crate::messages::{self, EventMeta, MessageSink, ProcessListEntry};
use crate::options::RunOptions;
use crate::process::forwarder;
use crate::process::registry::ProcessRegistry;
use crate::spawn::{ProcessHandle, Spawner};
use crate::{Error, Result};

/// A successfully spawned and registered process, as returned by
/// [`ProcessManager::spawn`].
#[derive(Clone)]
pub struct RunningProcess {
    /// Internal logical id of the registration.
    pub run_id: RunId,
    /// OS pid at spawn time.
    pub pid: Pid,
    /// Shared handle, usable for status checks.
    pub handle: Arc<dyn ProcessHandle>,
}

/// Orchestrates the lifecycle of all subprocesses belonging to one session.
pub struct ProcessManager {
    session_id: SessionId,
    registry: ProcessRegistry,
    spawner: Arc<dyn Spawner>,
    sink: Arc<dyn MessageSink>,
    destroyed: AtomicBool,
}

impl ProcessManager {
    /// Create a manager with an empty registry.
    pub fn new(
        session_id: SessionId,
        spawner: Arc<dyn Spawner>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            session_id,
            registry: ProcessRegistry::new(),
            spawner,
            sink,
            destroyed: AtomicBool::new(false),
        }
    }

    /// The owning session's id.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Spawn a process and start tracking it.
    ///
    /// On success the process is registered, a `processlist` `add` snapshot
    /// is broadcast, and an event forwarder task is attached before this
    /// returns. Spawn failures are surfaced to the caller and never retried.
    pub async fn spawn(&self, options: RunOptions) -> Result<RunningProcess> {
        let spawned = self
            .spawner
            .spawn(&options)
            .await
            .map_err(Error::Spawn)?;
        let pid = spawned.handle.pid().ok_or_else(|| {
            Error::Spawn(SpawnError::MissingMetadata {
                command: options.line.clone(),
            })
        })?;

        let run_id = self.registry.register(spawned.handle.clone(), options.clone())?;
        info!(
            session = %self.session_id,
            %run_id,
            %pid,
            line = %options.line,
            "spawned process"
        );

        let meta = EventMeta {
            pid,
            extra: options.clone(),
        };
        self.broadcast_processlist("add", Some(&meta)).await;
        forwarder::attach(
            run_id,
            spawned.handle.clone(),
            spawned.output,
            options.run_type.clone(),
            meta,
            self.sink.clone(),
        );

        Ok(RunningProcess {
            run_id,
            pid,
            handle: spawned.handle,
        })
    }

    /// Status query over all registered processes, keyed by pid.
    ///
    /// This is the only place dead entries are purged: any entry whose
    /// handle reports no pid or a kill marker is removed here. Each
    /// surviving entry's snapshot is annotated with its `extra` run options.
    pub fn ps(&self) -> Result<BTreeMap<u32, Value>> {
        let mut result = BTreeMap::new();
        for reg in self.registry.entries() {
            let live_pid = reg.handle.pid().filter(|_| !reg.handle.killed());
            let Some(pid) = live_pid else {
                debug!(session = %self.session_id, run_id = %reg.run_id, "purging dead process");
                self.registry.remove(reg.run_id);
                continue;
            };
            let mut status = serde_json::to_value(reg.handle.describe())
                .map_err(|e| Error::protocol(format!("unserializable status: {e}")))?;
            if let Some(obj) = status.as_object_mut() {
                obj.insert(
                    "extra".into(),
                    serde_json::to_value(&reg.options).unwrap_or(Value::Null),
                );
            }
            result.insert(pid.as_u32(), status);
        }
        Ok(result)
    }

    /// Mark a process killed and issue a forceful terminate signal.
    ///
    /// Idempotent while the pid is registered; returns
    /// [`Error::ProcessNotFound`] once the entry has been purged or never
    /// existed. There is no soft-cancel or grace period.
    pub async fn kill(&self, pid: Pid) -> Result<()> {
        let reg = self
            .registry
            .find_by_pid(pid)
            .ok_or(Error::ProcessNotFound { pid })?;
        reg.handle.mark_killed();
        reg.handle.kill().await?;
        info!(session = %self.session_id, %pid, "killed process");
        Ok(())
    }

    /// Forward an opaque debug payload to a live, debug-capable process.
    ///
    /// Fails without side effects when the pid is unknown
    /// ([`Error::ProcessNotFound`]) or the handle has no debug capability
    /// ([`Error::DebuggingUnsupported`]).
    pub fn send_debug_command(&self, pid: Pid, payload: &Value) -> Result<()> {
        let reg = self
            .registry
            .find_by_pid(pid)
            .ok_or(Error::ProcessNotFound { pid })?;
        let port = reg
            .handle
            .debug_port()
            .ok_or(Error::DebuggingUnsupported { pid })?;
        port.send(payload)
    }

    /// Broadcast a `processlist` snapshot tagged with `subtype` and return
    /// the entries it contained.
    ///
    /// The snapshot is in registration order; exited-but-unpurged entries
    /// appear with pid `0`. Clients sharing the session use these events to
    /// converge on the same view after any registry mutation.
    pub async fn list_processes(&self, subtype: &str) -> Result<Vec<ProcessListEntry>> {
        let entries = self.snapshot_entries();
        self.sink
            .send(messages::processlist_event(subtype, &entries, None))
            .await?;
        Ok(entries)
    }

    /// Pids of all registered processes that are currently live.
    pub fn tracked_pids(&self) -> Vec<Pid> {
        self.registry
            .entries()
            .iter()
            .filter_map(|reg| reg.handle.pid())
            .collect()
    }

    /// Number of registered processes, including exited-but-unpurged ones.
    pub fn tracked_count(&self) -> usize {
        self.registry.len()
    }

    /// Best-effort kill of every currently-known live process. Does not
    /// wait for OS-level termination and does not touch the registry.
    pub async fn kill_all(&self) {
        for reg in self.registry.entries() {
            if reg.handle.pid().is_none() {
                continue;
            }
            reg.handle.mark_killed();
            if let Err(e) = reg.handle.kill().await {
                warn!(
                    session = %self.session_id,
                    run_id = %reg.run_id,
                    error = %e,
                    "kill failed during teardown"
                );
            }
        }
    }

    pub(crate) fn snapshot_entries(&self) -> Vec<ProcessListEntry> {
        self.registry
            .entries()
            .iter()
            .map(|reg| ProcessListEntry {
                pid: reg.handle.pid().map(|p| p.as_u32()).unwrap_or(0),
                ide_run: reg.options.clone(),
            })
            .collect()
    }

    pub(crate) async fn broadcast_processlist(&self, subtype: &str, origin: Option<&EventMeta>) {
        let entries = self.snapshot_entries();
        let event = messages::processlist_event(subtype, &entries, origin);
        if let Err(e) = self.sink.send(event).await {
            warn!(session = %self.session_id, error = %e, "dropping processlist event");
        }
    }

    pub(crate) fn mark_destroyed(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}
