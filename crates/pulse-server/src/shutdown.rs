//! Shutdown of the HTTP listener and the sync scheduler.
//!
//! Both watch clones of one `CancellationToken`. Their join handles are
//! registered here by name; [`ShutdownCoordinator::drain`] cancels the token
//! and waits for each until a shared deadline. The scheduler only reacts to
//! cancellation between runs, so a pass in flight finishes inside that
//! window or is aborted and reported when the deadline passes.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the shutdown token and the tasks that must stop with it.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    timeout: Duration,
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.tasks.lock().iter().map(|(name, _)| *name).collect();
        f.debug_struct("ShutdownCoordinator")
            .field("cancelled", &self.token.is_cancelled())
            .field("tasks", &names)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ShutdownCoordinator {
    /// Coordinator with a 30 second drain window.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_DRAIN_TIMEOUT)
    }

    /// Coordinator that waits at most `timeout` for registered tasks.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            timeout,
        }
    }

    /// A clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Track `handle` so [`drain`](Self::drain) waits for it.
    pub fn register(&self, name: &'static str, handle: JoinHandle<()>) {
        self.tasks.lock().push((name, handle));
    }

    /// Cancel the token without waiting.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Cancel the token, then wait for every registered task.
    ///
    /// Returns the names of tasks still running at the deadline. Those
    /// tasks are aborted.
    pub async fn drain(&self) -> Vec<&'static str> {
        self.token.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        info!(
            task_count = tasks.len(),
            timeout_secs = self.timeout.as_secs(),
            "waiting for tasks to complete"
        );

        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut unfinished = Vec::new();
        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!(task = name, "task finished"),
                Ok(Err(e)) => warn!(task = name, error = %e, "task ended abnormally"),
                Err(_) => {
                    handle.abort();
                    unfinished.push(name);
                }
            }
        }
        if !unfinished.is_empty() {
            warn!(tasks = ?unfinished, "drain timed out after {:?}, tasks aborted", self.timeout);
        }
        unfinished
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
