//! Virtual Time Scheduler
//!
//! A scheduler whose clock only moves when its owner says so.
//!
//! # Algorithm
//!
//! Pending tasks live in an ordered map keyed by `(due, sequence)`:
//!
//! 1. `after` stamps the task with `now + delay` and a monotonically
//!    increasing sequence number, so tasks due at the same instant run in
//!    submission order.
//! 2. Advancing the clock repeatedly pops the earliest task due at or before
//!    the target, moves `now` to its due time and runs it with no lock held.
//!    Tasks may therefore schedule further tasks, and a zero-delay task
//!    scheduled from inside another task still runs during the same advance.
//! 3. Cancelled tasks are skipped when popped.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use super::{ScheduledHandle, Scheduler, Task, Timestamp};
use crate::error::SchedulerError;

struct PendingTask {
    task: Task,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct VirtualState {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), PendingTask>,
    shut_down: bool,
}

/// A deterministic, manually advanced scheduler.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = Arc::new(VirtualScheduler::new());
/// scheduler.after(Duration::from_millis(500), Box::new(|| println!("fired")))?;
///
/// scheduler.advance_by(Duration::from_millis(499)); // nothing yet
/// scheduler.advance_by(Duration::from_millis(1));   // prints "fired"
/// ```
#[derive(Default)]
pub struct VirtualScheduler {
    state: Mutex<VirtualState>,
}

impl VirtualScheduler {
    /// Create a scheduler whose clock reads zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `delta`, running every task that falls due.
    pub fn advance_by(&self, delta: Duration) {
        let target = self.state.lock().now + delta;
        self.advance_to(Timestamp::from_duration(target));
    }

    /// Move the clock to `target`, running every task due at or before it.
    ///
    /// Moving backwards is ignored; the clock never decreases.
    pub fn advance_to(&self, target: Timestamp) {
        let target = target.since_epoch();
        while let Some(pending) = self.pop_due(target) {
            Self::run(pending);
        }

        let mut state = self.state.lock();
        if state.now < target {
            state.now = target;
        }
    }

    /// Run every task already due without moving the clock.
    pub fn run_until_idle(&self) {
        let now = self.state.lock().now;
        self.advance_to(Timestamp::from_duration(now));
    }

    /// Refuse all future submissions.
    ///
    /// Tasks that were already accepted still run when their time comes.
    pub fn shutdown(&self) {
        self.state.lock().shut_down = true;
    }

    /// Number of accepted tasks that have neither run nor been cancelled.
    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .queue
            .values()
            .filter(|pending| !pending.cancelled.load(Ordering::Acquire))
            .count()
    }

    fn pop_due(&self, target: Duration) -> Option<PendingTask> {
        let mut state = self.state.lock();
        let (&(due, seq), _) = state.queue.first_key_value()?;
        if due > target {
            return None;
        }
        let pending = state.queue.remove(&(due, seq))?;
        if state.now < due {
            state.now = due;
        }
        Some(pending)
    }

    fn run(pending: PendingTask) {
        if pending.cancelled.load(Ordering::Acquire) {
            trace!("skipping cancelled task");
            return;
        }
        (pending.task)();
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Timestamp {
        Timestamp::from_duration(self.state.lock().now)
    }

    fn after(&self, delay: Duration, task: Task) -> Result<ScheduledHandle, SchedulerError> {
        let mut state = self.state.lock();
        if state.shut_down {
            return Err(SchedulerError::ShutDown);
        }

        let due = state.now.checked_add(delay).ok_or(SchedulerError::DelayOverflow)?;
        let seq = state.next_seq;
        state.next_seq += 1;

        let cancelled = Arc::new(AtomicBool::new(false));
        state.queue.insert(
            (due, seq),
            PendingTask {
                task,
                cancelled: Arc::clone(&cancelled),
            },
        );

        Ok(ScheduledHandle::new(cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let make = move |label: &'static str| -> Task {
            let log = Arc::clone(&log_clone);
            Box::new(move || log.lock().push(label))
        };
        (log, make)
    }

    #[test]
    fn tasks_run_in_due_order() {
        let scheduler = VirtualScheduler::new();
        let (log, task) = recorder();

        scheduler.after(Duration::from_millis(300), task("late")).unwrap();
        scheduler.after(Duration::from_millis(100), task("early")).unwrap();
        scheduler.after(Duration::from_millis(100), task("early-second")).unwrap();

        scheduler.advance_by(Duration::from_millis(99));
        assert!(log.lock().is_empty());

        scheduler.advance_by(Duration::from_millis(1));
        assert_eq!(*log.lock(), vec!["early", "early-second"]);

        scheduler.advance_by(Duration::from_secs(1));
        assert_eq!(*log.lock(), vec!["early", "early-second", "late"]);
        assert_eq!(scheduler.now(), Timestamp::from_millis(1100));
    }

    #[test]
    fn zero_delay_is_deferred_until_run() {
        let scheduler = VirtualScheduler::new();
        let (log, task) = recorder();

        scheduler.after(Duration::ZERO, task("now")).unwrap();
        assert!(log.lock().is_empty());

        scheduler.run_until_idle();
        assert_eq!(*log.lock(), vec!["now"]);
    }

    #[test]
    fn cancelled_tasks_are_skipped() {
        let scheduler = VirtualScheduler::new();
        let (log, task) = recorder();

        let handle = scheduler.after(Duration::from_millis(10), task("cancelled")).unwrap();
        scheduler.after(Duration::from_millis(10), task("kept")).unwrap();
        assert_eq!(scheduler.pending_count(), 2);

        handle.cancel();
        assert_eq!(scheduler.pending_count(), 1);

        scheduler.advance_by(Duration::from_millis(10));
        assert_eq!(*log.lock(), vec!["kept"]);
    }

    #[test]
    fn tasks_observe_their_due_time_and_can_reschedule() {
        let scheduler = Arc::new(VirtualScheduler::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner_scheduler = Arc::clone(&scheduler);
        let inner_seen = Arc::clone(&seen);
        scheduler
            .after(
                Duration::from_millis(250),
                Box::new(move || {
                    inner_seen.lock().push(inner_scheduler.now());
                    let seen = Arc::clone(&inner_seen);
                    let clock = Arc::clone(&inner_scheduler);
                    inner_scheduler
                        .after(
                            Duration::from_millis(250),
                            Box::new(move || seen.lock().push(clock.now())),
                        )
                        .unwrap();
                }),
            )
            .unwrap();

        scheduler.advance_by(Duration::from_secs(1));
        assert_eq!(
            *seen.lock(),
            vec![Timestamp::from_millis(250), Timestamp::from_millis(500)]
        );
    }

    #[test]
    fn shutdown_rejects_new_work_but_keeps_accepted_tasks() {
        let scheduler = VirtualScheduler::new();
        let (log, task) = recorder();

        scheduler.after(Duration::from_millis(5), task("accepted")).unwrap();
        scheduler.shutdown();

        let rejected = scheduler.after(Duration::from_millis(5), task("rejected"));
        assert_eq!(rejected.unwrap_err(), SchedulerError::ShutDown);

        scheduler.advance_by(Duration::from_millis(5));
        assert_eq!(*log.lock(), vec!["accepted"]);
    }

    #[test]
    fn rejects_a_delay_past_the_end_of_time() {
        let scheduler = VirtualScheduler::new();
        let (_log, task) = recorder();
        scheduler.advance_by(Duration::from_millis(1));

        let result = scheduler.after(Duration::MAX, task("never"));
        assert_eq!(result.unwrap_err(), SchedulerError::DelayOverflow);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn clock_never_moves_backwards() {
        let scheduler = VirtualScheduler::new();
        scheduler.advance_to(Timestamp::from_millis(500));
        scheduler.advance_to(Timestamp::from_millis(100));
        assert_eq!(scheduler.now(), Timestamp::from_millis(500));
    }
}
