//! Shutdown strategies: confirmed drain vs. best-effort immediate teardown.
//!
//! [`ProcessManager::prepare_shutdown`] waits until the registry is actually
//! empty, polling the status surface on a fixed interval; each poll also
//! performs the lazy purge, so killed and exited processes fall out of the
//! registry as the drain proceeds. [`ProcessManager::destroy`] instead stops
//! any in-flight drain and fires a kill at every live process without
//! waiting for OS-level termination. Callers pick based on whether they can
//! afford to wait.

use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::core::Pid;
use crate::process::ProcessManager;
use crate::Result;

/// Tuning for [`ProcessManager::prepare_shutdown`].
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// How often the registry is polled for emptiness.
    pub poll_interval: Duration,
    /// Optional cap on the total drain time. `None` polls indefinitely,
    /// which matches the base design but can hang on an unkillable process;
    /// with a deadline set, remaining processes are force-reported and the
    /// drain completes anyway.
    pub deadline: Option<Duration>,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            deadline: None,
        }
    }
}

impl DrainConfig {
    /// Config with a drain deadline.
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }
}

/// How a drain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every tracked process terminated; the registry is empty.
    Drained,
    /// The configured deadline expired with processes still live.
    DeadlineExpired {
        /// Pids still tracked when the drain gave up.
        remaining: Vec<Pid>,
    },
    /// [`ProcessManager::destroy`] was called while draining.
    Aborted,
}

impl ProcessManager {
    /// Wait until all tracked processes have stopped.
    ///
    /// Resolves exactly once: when the registry reports zero entries, when
    /// the configured deadline expires, or when [`destroy`] aborts the
    /// drain. Does not itself signal any process; pair with
    /// [`kill_all`] for a signalled drain.
    ///
    /// [`destroy`]: ProcessManager::destroy
    /// [`kill_all`]: ProcessManager::kill_all
    pub async fn prepare_shutdown(&self, config: DrainConfig) -> Result<DrainOutcome> {
        info!(session = %self.session_id(), "draining processes before shutdown");
        let started = Instant::now();
        let mut interval = tokio::time::interval(config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if self.is_destroyed() {
                info!(session = %self.session_id(), "drain aborted by destroy");
                return Ok(DrainOutcome::Aborted);
            }
            if self.ps()?.is_empty() {
                info!(session = %self.session_id(), "drain complete");
                return Ok(DrainOutcome::Drained);
            }
            if let Some(deadline) = config.deadline {
                if started.elapsed() >= deadline {
                    let remaining = self.tracked_pids();
                    warn!(
                        session = %self.session_id(),
                        ?remaining,
                        "drain deadline expired, force-reporting remaining processes"
                    );
                    return Ok(DrainOutcome::DeadlineExpired { remaining });
                }
            }
        }
    }

    /// Best-effort immediate teardown: stop any in-flight drain, then kill
    /// every currently-known process without waiting for OS-level
    /// termination.
    pub async fn destroy(&self) {
        info!(session = %self.session_id(), "destroying process manager");
        self.mark_destroyed();
        self.kill_all().await;
    }
}
