//! Shared test doubles: a scripted spawner producing controllable fake
//! processes, wired to the same seams the OS spawner uses.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};
use tokio::sync::{mpsc, oneshot};

use procman::core::Pid;
use procman::error::SpawnError;
use procman::options::RunOptions;
use procman::spawn::{DebugPort, OutputStreams, ProcessHandle, Spawned, Spawner, StatusSnapshot};
use procman::Result;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("procman=debug")
        .with_test_writer()
        .try_init();
}

/// Debug port that records every payload it is sent.
pub struct RecordingDebugPort {
    payloads: Mutex<Vec<Value>>,
}

impl RecordingDebugPort {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().unwrap().clone()
    }
}

impl DebugPort for RecordingDebugPort {
    fn send(&self, payload: &Value) -> Result<()> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// A fake process whose output and exit are driven by the test through a
/// [`FakeProcessControl`].
pub struct FakeProcess {
    pid: AtomicU32,
    killed: AtomicBool,
    line: String,
    started_at: DateTime<Utc>,
    exit_rx: Mutex<Option<oneshot::Receiver<i32>>>,
    debug: Option<Arc<RecordingDebugPort>>,
}

impl FakeProcess {
    pub fn debug_payloads(&self) -> Vec<Value> {
        self.debug
            .as_ref()
            .map(|d| d.payloads())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProcessHandle for FakeProcess {
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
        Ok(())
    }

    async fn wait(&self) -> i32 {
        let rx = self.exit_rx.lock().unwrap().take();
        match rx {
            Some(rx) => rx.await.unwrap_or(-1),
            None => -1,
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

    fn debug_port(&self) -> Option<&dyn DebugPort> {
        self.debug.as_deref().map(|d| d as &dyn DebugPort)
    }
}

/// Test-side controls for a [`FakeProcess`]: write output, then finish with
/// an exit code. Dropping the control without calling [`finish`] closes the
/// streams and surfaces the unknown-exit sentinel (`-1`).
///
/// [`finish`]: FakeProcessControl::finish
pub struct FakeProcessControl {
    pub handle: Arc<FakeProcess>,
    stdout: DuplexStream,
    stderr: DuplexStream,
    exit_tx: Option<oneshot::Sender<i32>>,
}

impl FakeProcessControl {
    pub async fn write_stdout(&mut self, data: &str) {
        self.stdout.write_all(data.as_bytes()).await.unwrap();
        self.stdout.flush().await.unwrap();
    }

    pub async fn write_stderr(&mut self, data: &str) {
        self.stderr.write_all(data.as_bytes()).await.unwrap();
        self.stderr.flush().await.unwrap();
    }

    /// Report the exit code while keeping both output streams open, the way
    /// a dead shell does when an orphaned grandchild still holds the pipes.
    pub fn signal_exit(&mut self, code: i32) {
        if let Some(tx) = self.exit_tx.take() {
            let _ = tx.send(code);
        }
    }

    /// Close both output streams and report the exit code.
    pub fn finish(mut self, code: i32) {
        self.signal_exit(code);
        // Dropping self closes the duplex write halves, which the forwarder
        // observes as EOF.
    }
}

pub fn fake_process(
    pid: u32,
    line: &str,
    with_debug: bool,
) -> (Arc<FakeProcess>, OutputStreams, FakeProcessControl) {
    let (stdout_wr, stdout_rd) = duplex(64 * 1024);
    let (stderr_wr, stderr_rd) = duplex(64 * 1024);
    let (exit_tx, exit_rx) = oneshot::channel();

    let handle = Arc::new(FakeProcess {
        pid: AtomicU32::new(pid),
        killed: AtomicBool::new(false),
        line: line.to_string(),
        started_at: Utc::now(),
        exit_rx: Mutex::new(Some(exit_rx)),
        debug: with_debug.then(RecordingDebugPort::new),
    });
    let output = OutputStreams {
        stdout: Box::new(stdout_rd),
        stderr: Box::new(stderr_rd),
    };
    let control = FakeProcessControl {
        handle: handle.clone(),
        stdout: stdout_wr,
        stderr: stderr_wr,
        exit_tx: Some(exit_tx),
    };
    (handle, output, control)
}

/// One scripted response from the [`ScriptedSpawner`].
pub enum SpawnScript {
    /// Fail the spawn with the given reason.
    Fail(String),
    /// Launch a fake process with the given pid.
    Launch { pid: u32, debug: bool },
}

impl SpawnScript {
    pub fn launch(pid: u32) -> Self {
        Self::Launch { pid, debug: false }
    }
}

/// [`Spawner`] that replays a script, handing each launched process's
/// control to the test through a channel.
pub struct ScriptedSpawner {
    script: Mutex<VecDeque<SpawnScript>>,
    controls: mpsc::UnboundedSender<FakeProcessControl>,
}

impl ScriptedSpawner {
    pub fn new(
        script: Vec<SpawnScript>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeProcessControl>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                script: Mutex::new(script.into()),
                controls: tx,
            }),
            rx,
        )
    }
}

#[async_trait]
impl Spawner for ScriptedSpawner {
    async fn spawn(&self, options: &RunOptions) -> std::result::Result<Spawned, SpawnError> {
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("spawn called with no script left");
        match step {
            SpawnScript::Fail(reason) => Err(SpawnError::Failed {
                command: options.line.clone(),
                reason,
                source: None,
            }),
            SpawnScript::Launch { pid, debug } => {
                let (handle, output, control) = fake_process(pid, &options.line, debug);
                let _ = self.controls.send(control);
                Ok(Spawned { handle, output })
            }
        }
    }
}
