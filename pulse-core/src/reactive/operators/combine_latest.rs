//! Combine Latest
//!
//! Pairs the most recent values of two publishers.
//!
//! Nothing is emitted until both sides have produced a value. After that,
//! every value from either side yields exactly one pair made of the new value
//! and whatever the other side last produced.
//!
//! The left source is subscribed before the right one. When both are
//! stateful, the left replay only fills its slot and the right replay emits
//! the first pair, still inside `subscribe`. Values arriving in the same
//! scheduler tick are handled as separate events in delivery order.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::reactive::publisher::{Publisher, Sink};
use crate::reactive::subscription::Subscription;

/// Publisher returned by [`PublisherExt::combine_latest`](crate::reactive::PublisherExt::combine_latest).
pub struct CombineLatest<A, B> {
    left: A,
    right: B,
}

impl<A, B> CombineLatest<A, B> {
    pub(crate) fn new(left: A, right: B) -> Self {
        Self { left, right }
    }
}

struct Slots<L, R> {
    left: Option<L>,
    right: Option<R>,
}

impl<A, B> Publisher for CombineLatest<A, B>
where
    A: Publisher,
    B: Publisher,
{
    type Output = (A::Output, B::Output);

    fn subscribe_sink(&self, sink: Sink<Self::Output>) -> Subscription {
        let slots = Arc::new(Mutex::new(Slots {
            left: None,
            right: None,
        }));

        let left = {
            let slots = Arc::clone(&slots);
            let sink = Arc::clone(&sink);
            self.left.subscribe_sink(Arc::new(move |value: A::Output| {
                let pair = {
                    let mut slots = slots.lock();
                    slots.left = Some(value.clone());
                    slots.right.clone().map(|right| (value, right))
                };
                if let Some(pair) = pair {
                    sink(pair);
                }
            }))
        };

        let right = self.right.subscribe_sink(Arc::new(move |value: B::Output| {
            let pair = {
                let mut slots = slots.lock();
                slots.right = Some(value.clone());
                slots.left.clone().map(|left| (left, value))
            };
            if let Some(pair) = pair {
                sink(pair);
            }
        }));

        Subscription::new(move || {
            left.cancel();
            right.cancel();
        })
    }
}
