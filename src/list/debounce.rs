use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::cache::lock::mutex_lock;

const SOURCE: &str = "list::debounce";

/// Runs only the most recently scheduled action, `delay` after it was
/// scheduled. Pending actions are aborted on drop.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Replaces any pending action with `action`.
    ///
    /// Outside a tokio runtime there is no timer, so the action runs at once.
    pub fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                target: "campus::list",
                "no tokio runtime; running debounced action immediately"
            );
            self.cancel();
            action();
            return;
        };

        let delay = self.delay;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        if let Some(previous) = mutex_lock(&self.pending, SOURCE, "schedule").replace(handle) {
            previous.abort();
        }
    }

    /// Aborts the pending action. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        match mutex_lock(&self.pending, SOURCE, "cancel").take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        mutex_lock(&self.pending, SOURCE, "is_pending")
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
