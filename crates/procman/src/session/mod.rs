//! Per-workspace session wrapper: inbound command dispatch and teardown.
//!
//! A [`Session`] owns one [`ProcessManager`] (and therefore one registry);
//! concurrent sessions never share process state. Inbound `run` commands are
//! routed to [`Session::handle_run`]; any failure is reported back through
//! the message sink as a structured `error` event carrying the request's
//! `uniqueId`, and never crashes the session.

use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::core::SessionId;
use crate::messages::{self, MessageSink};
use crate::options::RunOptions;
use crate::process::{DrainConfig, DrainOutcome, ProcessManager, RunningProcess};
use crate::spawn::Spawner;
use crate::{Error, Result};

/// One workspace's live process-management state.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use procman::messages::BufferedSink;
/// use procman::session::Session;
/// use procman::spawn::OsSpawner;
///
/// # #[tokio::main]
/// # async fn main() -> procman::Result<()> {
/// let (sink, mut events) = BufferedSink::channel(64);
/// let session = Session::new(Arc::new(OsSpawner::new()), Arc::new(sink));
///
/// session
///     .handle_run(serde_json::json!({
///         "line": "echo hi",
///         "type": "shell",
///         "uniqueId": "req-1",
///     }))
///     .await?;
///
/// while let Some(event) = events.recv().await {
///     println!("{event}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session {
    id: SessionId,
    manager: Arc<ProcessManager>,
    sink: Arc<dyn MessageSink>,
}

impl Session {
    /// Create a session with a generated id.
    pub fn new(spawner: Arc<dyn Spawner>, sink: Arc<dyn MessageSink>) -> Self {
        Self::with_id(SessionId::generate(), spawner, sink)
    }

    /// Create a session with a caller-chosen id.
    pub fn with_id(id: SessionId, spawner: Arc<dyn Spawner>, sink: Arc<dyn MessageSink>) -> Self {
        let manager = Arc::new(ProcessManager::new(id.clone(), spawner, sink.clone()));
        Self { id, manager, sink }
    }

    /// The session's id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The session's lifecycle manager, for direct query/kill/debug access.
    pub fn manager(&self) -> &Arc<ProcessManager> {
        &self.manager
    }

    /// Handle an inbound `run` command.
    ///
    /// The message body is the run options (`line`, `type`, `cwd`, ...);
    /// unknown fields are preserved and echoed as `extra` on every event for
    /// the spawned process. Failures — malformed messages and spawn errors
    /// alike — are reported to the sink as an `error` event correlated via
    /// the message's `uniqueId`, and `Ok(None)` is returned.
    pub async fn handle_run(&self, message: Value) -> Result<Option<RunningProcess>> {
        let unique_id = message
            .get("uniqueId")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let options = match serde_json::from_value::<RunOptions>(message) {
            Ok(options) => options,
            Err(e) => {
                let err = Error::protocol(format!("malformed run command: {e}"));
                self.report(&err, unique_id.as_deref()).await;
                return Ok(None);
            }
        };

        match self.manager.spawn(options).await {
            Ok(running) => Ok(Some(running)),
            Err(err) => {
                self.report(&err, unique_id.as_deref()).await;
                Ok(None)
            }
        }
    }

    /// Wait for all of this session's processes to stop. See
    /// [`ProcessManager::prepare_shutdown`].
    pub async fn prepare_shutdown(&self, config: DrainConfig) -> Result<DrainOutcome> {
        self.manager.prepare_shutdown(config).await
    }

    /// Best-effort immediate teardown. See [`ProcessManager::destroy`].
    pub async fn destroy(&self) {
        self.manager.destroy().await;
    }

    async fn report(&self, err: &Error, unique_id: Option<&str>) {
        warn!(session = %self.id, error = %err, "run command failed");
        let event = messages::error_event(err, unique_id);
        if let Err(e) = self.sink.send(event).await {
            warn!(session = %self.id, error = %e, "dropping error event");
        }
    }
}
