//! Event forwarder: subscribes to a process's output and exit and forwards
//! them as typed messages to the session's sink.
//!
//! The forwarder runs as one task per process, attached immediately after
//! registration. The output streams are wired before the task is spawned,
//! so the `start` message goes out one scheduling opportunity *after*
//! subscription. On the wire this makes start-before-data a best-effort
//! hint rather than a guarantee: a process that writes immediately can have
//! data buffered before any consumer reacts to `start`.
//!
//! The exit notification is raced against the stream reads rather than
//! gated on their EOF: a killed shell can leave an orphaned grandchild
//! holding the pipes open, and that must not withhold the exit message.
//! Output already buffered when the exit is observed is still shipped
//! before it.
//!
//! The exit path upholds the one hard ordering rule: the handle's pid is
//! cleared to the not-running sentinel *before* the exit message is sent,
//! so a status query racing with exit never reports the process as live.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::core::RunId;
use crate::messages::{self, EventMeta, MessageSink, OutputStream, ProcessEvent};
use crate::spawn::{OutputStreams, ProcessHandle};

const READ_BUF_SIZE: usize = 8192;

/// Attach forwarding for a freshly registered process. Returns the task
/// handle; the task runs until the process exits.
pub(crate) fn attach(
    run_id: RunId,
    handle: Arc<dyn ProcessHandle>,
    output: OutputStreams,
    run_type: String,
    meta: EventMeta,
    sink: Arc<dyn MessageSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        forward(run_id, handle, output, run_type, meta, sink).await;
    })
}

async fn forward(
    run_id: RunId,
    handle: Arc<dyn ProcessHandle>,
    output: OutputStreams,
    run_type: String,
    meta: EventMeta,
    sink: Arc<dyn MessageSink>,
) {
    emit(&sink, &run_type, &ProcessEvent::Start, &meta).await;

    let OutputStreams {
        mut stdout,
        mut stderr,
    } = output;
    let mut stdout_open = true;
    let mut stderr_open = true;
    let mut stdout_buf = vec![0u8; READ_BUF_SIZE];
    let mut stderr_buf = vec![0u8; READ_BUF_SIZE];

    let wait = handle.wait();
    tokio::pin!(wait);
    let mut exit_code = None;

    while exit_code.is_none() && (stdout_open || stderr_open) {
        tokio::select! {
            code = &mut wait => exit_code = Some(code),
            read = stdout.read(&mut stdout_buf), if stdout_open => {
                match read {
                    Ok(0) => stdout_open = false,
                    Ok(n) => {
                        let event = data_event(OutputStream::Stdout, &stdout_buf[..n]);
                        emit(&sink, &run_type, &event, &meta).await;
                    }
                    Err(e) => {
                        warn!(%run_id, error = %e, "stdout read failed");
                        stdout_open = false;
                    }
                }
            }
            read = stderr.read(&mut stderr_buf), if stderr_open => {
                match read {
                    Ok(0) => stderr_open = false,
                    Ok(n) => {
                        let event = data_event(OutputStream::Stderr, &stderr_buf[..n]);
                        emit(&sink, &run_type, &event, &meta).await;
                    }
                    Err(e) => {
                        warn!(%run_id, error = %e, "stderr read failed");
                        stderr_open = false;
                    }
                }
            }
        }
    }

    let code = match exit_code {
        Some(code) => code,
        None => wait.await,
    };

    // Ship output that was already buffered when the exit was observed,
    // without blocking on streams an orphan may still hold open.
    while stdout_open {
        match timeout(Duration::ZERO, stdout.read(&mut stdout_buf)).await {
            Ok(Ok(n)) if n > 0 => {
                let event = data_event(OutputStream::Stdout, &stdout_buf[..n]);
                emit(&sink, &run_type, &event, &meta).await;
            }
            _ => stdout_open = false,
        }
    }
    while stderr_open {
        match timeout(Duration::ZERO, stderr.read(&mut stderr_buf)).await {
            Ok(Ok(n)) if n > 0 => {
                let event = data_event(OutputStream::Stderr, &stderr_buf[..n]);
                emit(&sink, &run_type, &event, &meta).await;
            }
            _ => stderr_open = false,
        }
    }

    // Pid must read as not-running before any consumer can observe the exit
    // event.
    handle.clear_pid();
    debug!(%run_id, code, "process exited");
    emit(&sink, &run_type, &ProcessEvent::Exit { code }, &meta).await;
}

fn data_event(stream: OutputStream, bytes: &[u8]) -> ProcessEvent {
    ProcessEvent::Data {
        stream,
        data: String::from_utf8_lossy(bytes).into_owned(),
    }
}

async fn emit(sink: &Arc<dyn MessageSink>, run_type: &str, event: &ProcessEvent, meta: &EventMeta) {
    let message = messages::process_event(run_type, event, meta);
    if let Err(e) = sink.send(message).await {
        warn!(pid = %meta.pid, error = %e, "dropping event, sink unavailable");
    }
}
