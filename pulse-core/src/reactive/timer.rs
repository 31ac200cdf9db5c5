//! Timer Publisher
//!
//! A publisher of timestamps emitted every `interval` while running.
//!
//! # States
//!
//! ```text
//!            start()               stop() / scheduler failure
//!   Idle ───────────────▶ Running ─────────────────────────────▶ Stopped
//!                            ▲                                      │
//!                            └──────────────── start() ─────────────┘
//! ```
//!
//! Every `start()` from `Idle` or `Stopped` begins a new run with its own
//! generation number. Ticks are a chain of one-shot scheduler tasks, each
//! tagged with the generation that scheduled it, so a tick left over from an
//! earlier run is ignored and a restarted timer ticks `interval` after the
//! restart regardless of the previous run's phase.
//!
//! The published value is `Some(timestamp)` after each tick and `None` while
//! the timer is not producing ticks: before the first tick and after a stop
//! or failure. New subscribers receive the current value immediately.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::publisher::{Publisher, Sink};
use super::subject::CurrentValueSubject;
use super::subscription::Subscription;
use crate::error::SchedulerError;
use crate::schedule::{ScheduledHandle, SharedScheduler, Timestamp};

/// Lifecycle phase of a [`TimerPublisher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Stopped,
}

/// How the most recent run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCompletion {
    /// Stopped on request.
    Finished,
    /// The scheduler refused the next tick.
    Failed(SchedulerError),
}

struct TimerState {
    phase: TimerPhase,
    generation: u64,
    tick: Option<ScheduledHandle>,
    ticks: u64,
    completion: Option<TimerCompletion>,
}

struct TimerInner {
    interval: Duration,
    scheduler: SharedScheduler,
    output: CurrentValueSubject<Option<Timestamp>>,
    state: Mutex<TimerState>,
}

/// A restartable periodic publisher.
///
/// # Example
///
/// ```rust,ignore
/// let timer = TimerPublisher::new(Duration::from_secs(1), scheduler);
/// let _sub = timer.subscribe(|now| println!("tick: {now:?}"));
///
/// timer.start();
/// // ... later
/// timer.stop(); // subscribers receive `None`
/// ```
#[derive(Clone)]
pub struct TimerPublisher {
    inner: Arc<TimerInner>,
}

impl TimerPublisher {
    /// Create an idle timer.
    pub fn new(interval: Duration, scheduler: SharedScheduler) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                interval,
                scheduler,
                output: CurrentValueSubject::new(None),
                state: Mutex::new(TimerState {
                    phase: TimerPhase::Idle,
                    generation: 0,
                    tick: None,
                    ticks: 0,
                    completion: None,
                }),
            }),
        }
    }

    /// Begin a fresh run. No-op while already running.
    pub fn start(&self) {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.phase == TimerPhase::Running {
                debug!("timer already running");
                return;
            }
            state.phase = TimerPhase::Running;
            state.generation += 1;
            state.ticks = 0;
            state.completion = None;
            state.generation
        };

        info!(interval_ms = self.inner.interval.as_millis() as u64, "timer started");
        TimerInner::schedule_tick(&self.inner, generation);
    }

    /// End the current run and clear the published value. No-op unless
    /// running.
    pub fn stop(&self) {
        let tick = {
            let mut state = self.inner.state.lock();
            if state.phase != TimerPhase::Running {
                return;
            }
            state.phase = TimerPhase::Stopped;
            state.generation += 1;
            state.completion = Some(TimerCompletion::Finished);
            state.tick.take()
        };

        if let Some(tick) = tick {
            tick.cancel();
        }
        info!("timer stopped");
        self.inner.output.send(None);
    }

    /// Stop when running, start otherwise.
    pub fn toggle(&self) {
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.inner.state.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == TimerPhase::Running
    }

    /// Ticks emitted during the current (or last) run.
    pub fn tick_count(&self) -> u64 {
        self.inner.state.lock().ticks
    }

    /// How the last run ended, if it has.
    pub fn completion(&self) -> Option<TimerCompletion> {
        self.inner.state.lock().completion.clone()
    }

    /// The timestamp of the latest tick of the current run.
    pub fn value(&self) -> Option<Timestamp> {
        self.inner.output.value()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl TimerInner {
    fn schedule_tick(inner: &Arc<Self>, generation: u64) {
        {
            let state = inner.state.lock();
            if state.generation != generation || state.phase != TimerPhase::Running {
                return;
            }
        }

        // A zero period would re-arm at the same instant forever.
        if inner.interval.is_zero() {
            inner.fail(generation, SchedulerError::ZeroInterval);
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(inner);
        let result = inner.scheduler.after(
            inner.interval,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Self::fire(&inner, generation);
                }
            }),
        );

        match result {
            Ok(handle) => {
                let mut state = inner.state.lock();
                if state.generation == generation && state.phase == TimerPhase::Running {
                    state.tick = Some(handle);
                } else {
                    handle.cancel();
                }
            }
            Err(error) => inner.fail(generation, error),
        }
    }

    fn fire(inner: &Arc<Self>, generation: u64) {
        {
            let mut state = inner.state.lock();
            if state.generation != generation || state.phase != TimerPhase::Running {
                return;
            }
            state.tick = None;
            state.ticks += 1;
        }

        inner.output.send(Some(inner.scheduler.now()));
        // A subscriber may have stopped the timer during delivery;
        // `schedule_tick` re-checks the generation.
        Self::schedule_tick(inner, generation);
    }

    fn fail(&self, generation: u64, error: SchedulerError) {
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.phase = TimerPhase::Stopped;
            state.generation += 1;
            state.tick = None;
            state.completion = Some(TimerCompletion::Failed(error.clone()));
        }

        warn!(%error, "timer terminated by scheduler failure");
        self.output.send(None);
    }
}

impl Publisher for TimerPublisher {
    type Output = Option<Timestamp>;

    fn subscribe_sink(&self, sink: Sink<Option<Timestamp>>) -> Subscription {
        self.inner.output.subscribe_sink(sink)
    }
}

impl fmt::Debug for TimerPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TimerPublisher")
            .field("interval", &self.inner.interval)
            .field("phase", &state.phase)
            .field("ticks", &state.ticks)
            .finish()
    }
}
