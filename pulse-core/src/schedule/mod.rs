//! Scheduling
//!
//! Every deferred piece of work in the crate (debounce windows, timer ticks,
//! the data service's pre-planned sends, `receive_on` hops) goes through the
//! [`Scheduler`] trait. A scheduler represents the single designated context
//! on which sinks run: it accepts a task and a delay and hands back a
//! [`ScheduledHandle`] that can cancel the task before it fires.
//!
//! # Implementations
//!
//! - [`VirtualScheduler`]: a manually advanced clock. Tasks only run when the
//!   owner calls `advance_by`, `advance_to` or `run_until_idle`, which makes
//!   every timing property reproducible.
//! - [`TokioScheduler`]: wall-clock scheduling on a tokio runtime. Each task
//!   is a spawned sleep that can be aborted.

mod realtime;
mod virtual_time;

pub use realtime::TokioScheduler;
pub use virtual_time::VirtualScheduler;

use std::fmt;
use std::ops::{Add, Sub};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A scheduler shared between publishers and operators.
pub type SharedScheduler = Arc<dyn Scheduler>;

/// A point in time measured from the scheduler's epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The scheduler's epoch.
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    pub fn from_duration(since_epoch: Duration) -> Self {
        Self(since_epoch)
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Time elapsed since the scheduler's epoch.
    pub fn since_epoch(&self) -> Duration {
        self.0
    }

    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Timestamp) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

/// A clock that can run work after a delay.
pub trait Scheduler: Send + Sync + 'static {
    /// Current time on this scheduler's clock.
    fn now(&self) -> Timestamp;

    /// Run `task` once `delay` has elapsed.
    ///
    /// The task never runs synchronously inside this call, even for a zero
    /// delay.
    fn after(&self, delay: Duration, task: Task) -> Result<ScheduledHandle, SchedulerError>;
}

/// Handle to a task submitted through [`Scheduler::after`].
///
/// Dropping the handle does not cancel the task.
pub struct ScheduledHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<tokio::task::AbortHandle>,
}

impl ScheduledHandle {
    pub(crate) fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled,
            abort: None,
        }
    }

    pub(crate) fn with_abort(cancelled: Arc<AtomicBool>, abort: tokio::task::AbortHandle) -> Self {
        Self {
            cancelled,
            abort: Some(abort),
        }
    }

    /// Prevent the task from running. Idempotent; a no-op once it has run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ScheduledHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
