//! Debounce
//!
//! Suppresses values until the source has been quiet for a full interval.
//!
//! # Algorithm
//!
//! Each subscription owns a [`DebounceState`]:
//!
//! 1. An upstream value cancels the scheduled emission (if any), becomes the
//!    pending value and bumps the generation counter.
//! 2. A new emission is scheduled `interval` later, tagged with that
//!    generation.
//! 3. When it fires and the generation still matches, the pending value is
//!    taken and delivered. A stale tag means a newer value superseded it.
//!
//! Cancelling the subscription closes the state and cancels the scheduled
//! emission, so nothing is delivered after teardown.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use crate::reactive::publisher::{Publisher, Sink};
use crate::reactive::subscription::Subscription;
use crate::schedule::{ScheduledHandle, SharedScheduler};

/// Publisher returned by [`PublisherExt::debounce`](crate::reactive::PublisherExt::debounce).
pub struct Debounce<P> {
    source: P,
    interval: Duration,
    scheduler: SharedScheduler,
}

impl<P> Debounce<P> {
    pub(crate) fn new(source: P, interval: Duration, scheduler: SharedScheduler) -> Self {
        Self {
            source,
            interval,
            scheduler,
        }
    }
}

struct DebounceState<T> {
    pending: Option<T>,
    scheduled: Option<ScheduledHandle>,
    generation: u64,
    closed: bool,
}

impl<T> DebounceState<T> {
    fn close(&mut self) {
        self.closed = true;
        self.pending = None;
        if let Some(handle) = self.scheduled.take() {
            handle.cancel();
        }
    }
}

impl<P> Publisher for Debounce<P>
where
    P: Publisher,
{
    type Output = P::Output;

    fn subscribe_sink(&self, sink: Sink<P::Output>) -> Subscription {
        let state = Arc::new(Mutex::new(DebounceState {
            pending: None,
            scheduled: None,
            generation: 0,
            closed: false,
        }));

        let upstream = {
            let state = Arc::clone(&state);
            let scheduler = Arc::clone(&self.scheduler);
            let interval = self.interval;

            self.source.subscribe_sink(Arc::new(move |value: P::Output| {
                let generation = {
                    let mut guard = state.lock();
                    if guard.closed {
                        return;
                    }
                    if let Some(handle) = guard.scheduled.take() {
                        handle.cancel();
                    }
                    guard.pending = Some(value);
                    guard.generation += 1;
                    guard.generation
                };

                let weak: Weak<Mutex<DebounceState<P::Output>>> = Arc::downgrade(&state);
                let sink = Arc::clone(&sink);
                let fire = move || {
                    let Some(state) = weak.upgrade() else {
                        return;
                    };
                    let value = {
                        let mut guard = state.lock();
                        if guard.closed || guard.generation != generation {
                            return;
                        }
                        guard.scheduled = None;
                        guard.pending.take()
                    };
                    if let Some(value) = value {
                        sink(value);
                    }
                };

                match scheduler.after(interval, Box::new(fire)) {
                    Ok(handle) => {
                        let mut guard = state.lock();
                        if guard.closed || guard.generation != generation {
                            handle.cancel();
                        } else {
                            guard.scheduled = Some(handle);
                        }
                    }
                    Err(error) => {
                        warn!(%error, "debounce could not schedule emission; value dropped");
                        let mut guard = state.lock();
                        if guard.generation == generation {
                            guard.pending = None;
                        }
                    }
                }
            }))
        };

        Subscription::new(move || {
            upstream.cancel();
            state.lock().close();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{PassthroughSubject, PublisherExt};
    use crate::schedule::{Scheduler, Timestamp, VirtualScheduler};

    type Seen<T> = Arc<Mutex<Vec<(Timestamp, T)>>>;

    fn debounced(
        interval_ms: u64,
    ) -> (
        Arc<VirtualScheduler>,
        PassthroughSubject<&'static str>,
        Seen<&'static str>,
        Subscription,
    ) {
        let scheduler = Arc::new(VirtualScheduler::new());
        let source = PassthroughSubject::new();
        let seen: Seen<&'static str> = Arc::new(Mutex::new(Vec::new()));

        let clock = Arc::clone(&scheduler);
        let seen_clone = Arc::clone(&seen);
        let sub = source
            .clone()
            .debounce(Duration::from_millis(interval_ms), scheduler.clone())
            .subscribe(move |v| seen_clone.lock().push((clock.now(), v)));

        (scheduler, source, seen, sub)
    }

    #[test]
    fn emits_last_value_after_quiet_period() {
        let (scheduler, source, seen, _sub) = debounced(500);

        source.send("a");
        scheduler.advance_by(Duration::from_millis(100));
        source.send("ab");
        scheduler.advance_by(Duration::from_millis(100));
        source.send("abc");

        scheduler.advance_by(Duration::from_millis(499));
        assert!(seen.lock().is_empty());

        scheduler.advance_by(Duration::from_millis(1));
        assert_eq!(*seen.lock(), vec![(Timestamp::from_millis(700), "abc")]);

        // A later value after the window opens a fresh one.
        scheduler.advance_to(Timestamp::from_millis(1300));
        source.send("abcd");
        scheduler.advance_by(Duration::from_secs(1));
        assert_eq!(
            *seen.lock(),
            vec![
                (Timestamp::from_millis(700), "abc"),
                (Timestamp::from_millis(1800), "abcd"),
            ]
        );
    }

    #[test]
    fn new_value_restarts_the_window() {
        let (scheduler, source, seen, _sub) = debounced(500);

        source.send("first");
        scheduler.advance_by(Duration::from_millis(400));
        source.send("second");
        scheduler.advance_by(Duration::from_millis(400));
        assert!(seen.lock().is_empty());

        scheduler.advance_by(Duration::from_millis(100));
        assert_eq!(*seen.lock(), vec![(Timestamp::from_millis(900), "second")]);
    }

    #[test]
    fn only_one_emission_is_ever_pending() {
        let (scheduler, source, _seen, _sub) = debounced(500);

        for value in ["a", "b", "c", "d"] {
            source.send(value);
        }
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn cancellation_drops_pending_emission() {
        let (scheduler, source, seen, sub) = debounced(500);

        source.send("never");
        sub.cancel();
        assert_eq!(scheduler.pending_count(), 0);

        scheduler.advance_by(Duration::from_secs(1));
        source.send("still never");
        scheduler.advance_by(Duration::from_secs(1));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn scheduler_failure_drops_the_value() {
        let (scheduler, source, seen, _sub) = debounced(500);

        scheduler.shutdown();
        source.send("lost");
        scheduler.advance_by(Duration::from_secs(1));
        assert!(seen.lock().is_empty());
    }
}
