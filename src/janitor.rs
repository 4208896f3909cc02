use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::store::LocalStore;

/// Periodic sweep removing invalid entries from a local store.
///
/// The remote tier is never swept; it relies on the validity check at read
/// time.
#[derive(Clone)]
pub struct Janitor {
    store: Arc<dyn LocalStore>,
    period: Duration,
}

impl Janitor {
    /// A zero `period` is raised to one millisecond.
    pub fn new(store: Arc<dyn LocalStore>, period: Duration) -> Self {
        Janitor {
            store,
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one sweep, returning the number of entries removed.
    pub fn sweep(&self) -> usize {
        let purged = self.store.purge_invalid();
        tracing::debug!(
            "Janitor sweep: store={}, purged={}, remaining={}",
            self.store.name(),
            purged,
            self.store.len()
        );
        purged
    }

    /// Start sweeping every period on the current tokio runtime.
    ///
    /// The first sweep happens one period after start. The task stops when
    /// the returned handle is stopped or dropped.
    pub fn spawn(self) -> JanitorHandle {
        let janitor = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + janitor.period, janitor.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                janitor.sweep();
            }
        });

        JanitorHandle {
            janitor: self,
            task: Some(task),
        }
    }
}

/// Handle to a running janitor task.
pub struct JanitorHandle {
    janitor: Janitor,
    task: Option<JoinHandle<()>>,
}

impl JanitorHandle {
    /// Sweep immediately, outside the schedule.
    pub fn sweep_now(&self) -> usize {
        self.janitor.sweep()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the periodic task.
    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for JanitorHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
