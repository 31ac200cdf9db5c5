//! Receive On
//!
//! Moves delivery onto a scheduler. Each upstream value is handed to the
//! scheduler with a zero delay and reaches the sink when that scheduler runs
//! it, preserving order. This is the explicit marshalling hop for values that
//! originate outside the designated delivery context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::reactive::publisher::{Publisher, Sink};
use crate::reactive::subscription::Subscription;
use crate::schedule::SharedScheduler;

/// Publisher returned by [`PublisherExt::receive_on`](crate::reactive::PublisherExt::receive_on).
pub struct ReceiveOn<P> {
    source: P,
    scheduler: SharedScheduler,
}

impl<P> ReceiveOn<P> {
    pub(crate) fn new(source: P, scheduler: SharedScheduler) -> Self {
        Self { source, scheduler }
    }
}

impl<P> Publisher for ReceiveOn<P>
where
    P: Publisher,
{
    type Output = P::Output;

    fn subscribe_sink(&self, sink: Sink<P::Output>) -> Subscription {
        let closed = Arc::new(AtomicBool::new(false));

        let upstream = {
            let closed = Arc::clone(&closed);
            let scheduler = Arc::clone(&self.scheduler);
            self.source.subscribe_sink(Arc::new(move |value: P::Output| {
                let closed = Arc::clone(&closed);
                let sink = Arc::clone(&sink);
                let hop = move || {
                    if !closed.load(Ordering::Acquire) {
                        sink(value);
                    }
                };
                if let Err(error) = scheduler.after(Duration::ZERO, Box::new(hop)) {
                    warn!(%error, "receive_on could not schedule delivery; value dropped");
                }
            }))
        };

        Subscription::new(move || {
            closed.store(true, Ordering::Release);
            upstream.cancel();
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::reactive::{PassthroughSubject, PublisherExt};
    use crate::schedule::VirtualScheduler;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn delivery_waits_for_the_scheduler() {
        let scheduler = Arc::new(VirtualScheduler::new());
        let source = PassthroughSubject::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let _sub = source
            .clone()
            .receive_on(scheduler.clone())
            .subscribe(move |v| seen_clone.lock().push(v));

        source.send(1);
        source.send(2);
        assert!(seen.lock().is_empty());

        scheduler.run_until_idle();
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn cancelled_before_hop_delivers_nothing() {
        let scheduler = Arc::new(VirtualScheduler::new());
        let source = PassthroughSubject::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let sub = source
            .clone()
            .receive_on(scheduler.clone())
            .subscribe(move |v: i32| seen_clone.lock().push(v));

        source.send(1);
        sub.cancel();
        scheduler.run_until_idle();
        assert!(seen.lock().is_empty());
    }
}
