//! OS-backed spawner over `tokio::process`.
//!
//! Command lines without an explicit `argv` run through the platform shell
//! (`/bin/sh -c` on Unix, `cmd /C` on Windows). Stdout and stderr are piped;
//! stdin is closed. On Unix each child leads its own process group, so a
//! kill signals the whole shell job rather than just the shell and never
//! leaves an orphaned grandchild running. The child is registered with
//! `kill_on_drop` and the handle additionally best-effort kills on drop, so
//! a session torn down without explicit cleanup does not leak processes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::process::Stdio;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::core::Pid;
use crate::error::SpawnError;
use crate::options::RunOptions;
use crate::spawn::{OutputStreams, ProcessHandle, Spawned, Spawner, StatusSnapshot};
use crate::Result;

/// How often an in-flight `wait` re-checks a child that has not exited yet.
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawner backed by `tokio::process::Command`.
#[derive(Debug, Default)]
pub struct OsSpawner;

impl OsSpawner {
    /// Create a new OS spawner.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

fn build_command(options: &RunOptions) -> Command {
    let mut cmd = match options.argv.as_deref() {
        Some([program, args @ ..]) => {
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
        _ => shell_command(&options.line),
    };
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    if let Some(path) = &options.path {
        cmd.env("PATH", path);
    }
    cmd.envs(&options.env);
    cmd
}

#[async_trait]
impl Spawner for OsSpawner {
    async fn spawn(&self, options: &RunOptions) -> std::result::Result<Spawned, SpawnError> {
        let mut cmd = build_command(options);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The child leads its own process group so kill can take down the
        // whole shell job.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| SpawnError::Failed {
            command: options.line.clone(),
            reason: e.to_string(),
            source: Some(e),
        })?;

        let pid = child.id().ok_or_else(|| SpawnError::MissingMetadata {
            command: options.line.clone(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SpawnError::MissingMetadata {
            command: options.line.clone(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| SpawnError::MissingMetadata {
            command: options.line.clone(),
        })?;

        debug!(pid, line = %options.line, "spawned OS process");

        let handle: Arc<dyn ProcessHandle> =
            Arc::new(OsProcess::new(pid, options.line.clone(), child));
        Ok(Spawned {
            handle,
            output: OutputStreams {
                stdout: Box::new(stdout),
                stderr: Box::new(stderr),
            },
        })
    }
}

/// [`ProcessHandle`] over a `tokio::process::Child`.
///
/// The pid lives in an atomic with `0` as the not-running sentinel; the
/// child itself sits behind a mutex shared between kill and the reaping
/// `wait` loop.
pub struct OsProcess {
    pid: AtomicU32,
    killed: AtomicBool,
    line: String,
    started_at: DateTime<Utc>,
    child: Mutex<Option<Child>>,
    // Process group id, fixed at spawn time. Outlives the live pid so a
    // kill issued mid-exit still targets the right group.
    #[cfg(unix)]
    group: i32,
}

impl OsProcess {
    fn new(pid: u32, line: String, child: Child) -> Self {
        Self {
            pid: AtomicU32::new(pid),
            killed: AtomicBool::new(false),
            line,
            started_at: Utc::now(),
            child: Mutex::new(Some(child)),
            #[cfg(unix)]
            group: pid as i32,
        }
    }

    #[cfg(unix)]
    fn signal_group(&self) {
        // SAFETY: a negative pid addresses the process group the child was
        // placed in at spawn.
        let rc = unsafe { libc::kill(-self.group, libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            // ESRCH: the group is already gone.
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!(line = %self.line, error = %err, "group kill failed");
            }
        }
    }
}

#[async_trait]
impl ProcessHandle for OsProcess {
    fn pid(&self) -> Option<Pid> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(Pid::new(pid)),
        }
    }

    fn clear_pid(&self) {
        self.pid.store(0, Ordering::SeqCst);
    }

    fn killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    fn mark_killed(&self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    async fn kill(&self) -> Result<()> {
        self.mark_killed();
        #[cfg(unix)]
        self.signal_group();
        #[cfg(not(unix))]
        {
            let mut guard = self
                .child
                .lock()
                .map_err(|e| crate::Error::protocol(format!("child lock poisoned: {e}")))?;
            if let Some(child) = guard.as_mut() {
                // Best-effort: the child may have exited between the check
                // and the signal.
                if let Err(e) = child.start_kill() {
                    warn!(line = %self.line, error = %e, "kill signal failed");
                }
            }
        }
        Ok(())
    }

    async fn wait(&self) -> i32 {
        loop {
            let status = {
                let mut guard = match self.child.lock() {
                    Ok(guard) => guard,
                    Err(_) => return -1,
                };
                match guard.as_mut() {
                    None => return -1,
                    Some(child) => match child.try_wait() {
                        Ok(Some(status)) => {
                            *guard = None;
                            Some(status)
                        }
                        Ok(None) => None,
                        Err(e) => {
                            warn!(line = %self.line, error = %e, "wait failed, assuming exited");
                            *guard = None;
                            return -1;
                        }
                    },
                }
            };
            if let Some(status) = status {
                return status.code().unwrap_or(-1);
            }
            tokio::time::sleep(REAP_POLL_INTERVAL).await;
        }
    }

    fn describe(&self) -> StatusSnapshot {
        let pid = self.pid();
        StatusSnapshot {
            command: self.line.clone(),
            started_at: self.started_at,
            uptime_ms: (Utc::now() - self.started_at).num_milliseconds(),
            running: pid.is_some() && !self.killed(),
            pid,
            killed: self.killed(),
        }
    }
}

impl Drop for OsProcess {
    fn drop(&mut self) {
        // A cleared pid means the process was reaped; its group id may
        // already belong to someone else.
        if self.pid.load(Ordering::SeqCst) == 0 {
            return;
        }
        #[cfg(unix)]
        self.signal_group();
        #[cfg(not(unix))]
        if let Ok(mut guard) = self.child.lock() {
            if let Some(child) = guard.as_mut() {
                if let Err(e) = child.start_kill() {
                    debug!(line = %self.line, error = %e, "process already gone on drop");
                }
            }
        }
    }
}
