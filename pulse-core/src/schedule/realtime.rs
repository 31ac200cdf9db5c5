//! Tokio-backed scheduler.
//!
//! Each task becomes a spawned future that sleeps for the requested delay and
//! then runs the task unless it was cancelled in the meantime. Cancelling the
//! handle also aborts the sleeping future so that no timer lingers.
//!
//! Sinks run on whichever worker polls the spawned future. To keep all
//! delivery on one designated context, drive this scheduler from a
//! current-thread runtime (or a `LocalSet`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use super::{ScheduledHandle, Scheduler, Task, Timestamp};
use crate::error::SchedulerError;

/// Scheduler that runs tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    epoch: Instant,
}

impl TokioScheduler {
    /// Bind to the runtime the calling thread is running on.
    pub fn current() -> Result<Self, SchedulerError> {
        let handle = Handle::try_current().map_err(|_| SchedulerError::RuntimeUnavailable)?;
        Ok(Self::from_handle(handle))
    }

    /// Bind to an explicit runtime handle.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            epoch: Instant::now(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Timestamp {
        Timestamp::from_duration(self.epoch.elapsed())
    }

    fn after(&self, delay: Duration, task: Task) -> Result<ScheduledHandle, SchedulerError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if !flag.load(Ordering::Acquire) {
                task();
            }
        });

        Ok(ScheduledHandle::with_abort(cancelled, join.abort_handle()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn current_without_runtime_fails() {
        assert_eq!(
            TokioScheduler::current().unwrap_err(),
            SchedulerError::RuntimeUnavailable
        );
    }

    #[tokio::test(start_paused = true)]
    async fn runs_task_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let fired = Arc::new(Mutex::new(None));
        let fired_clone = Arc::clone(&fired);
        let clock = scheduler.clone();

        scheduler
            .after(
                Duration::from_millis(500),
                Box::new(move || *fired_clone.lock() = Some(clock.now())),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(fired.lock().is_none());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let at = fired.lock().expect("task should have fired");
        assert!(at.since_epoch() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs() {
        let scheduler = TokioScheduler::current().unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = Arc::clone(&fired);

        let handle = scheduler
            .after(
                Duration::from_millis(100),
                Box::new(move || fired_clone.store(true, Ordering::SeqCst)),
            )
            .unwrap();
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
