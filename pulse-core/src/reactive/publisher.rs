//! The publisher abstraction and its operator surface.

use std::sync::Arc;
use std::time::Duration;

use super::operators::{CombineLatest, Debounce, Map, ReceiveOn};
use super::published::Published;
use super::subscription::Subscription;
use crate::schedule::SharedScheduler;

/// A sink receiving a publisher's values.
pub type Sink<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A source of values over time.
///
/// Implementors only provide [`subscribe_sink`](Publisher::subscribe_sink);
/// everything else lives in [`PublisherExt`].
pub trait Publisher: Send + Sync + 'static {
    /// The element type.
    type Output: Clone + Send + Sync + 'static;

    /// Attach `sink` and return the handle that keeps it attached.
    fn subscribe_sink(&self, sink: Sink<Self::Output>) -> Subscription;
}

/// Operators available on every publisher.
pub trait PublisherExt: Publisher {
    /// Attach a closure as a sink.
    fn subscribe<F>(&self, sink: F) -> Subscription
    where
        F: Fn(Self::Output) + Send + Sync + 'static,
    {
        self.subscribe_sink(Arc::new(sink))
    }

    /// Transform every value with a total function.
    ///
    /// For a fallible transform, map into `Result<U, E>` so failures travel
    /// downstream as values.
    fn map<U, F>(self, transform: F) -> Map<Self, F>
    where
        Self: Sized,
        U: Clone + Send + Sync + 'static,
        F: Fn(Self::Output) -> U + Send + Sync + 'static,
    {
        Map::new(self, transform)
    }

    /// Emit a value only once `interval` passed without a newer one.
    fn debounce(self, interval: Duration, scheduler: SharedScheduler) -> Debounce<Self>
    where
        Self: Sized,
    {
        Debounce::new(self, interval, scheduler)
    }

    /// Pair the latest values of `self` and `other` once both have emitted.
    fn combine_latest<P>(self, other: P) -> CombineLatest<Self, P>
    where
        Self: Sized,
        P: Publisher,
    {
        CombineLatest::new(self, other)
    }

    /// Deliver every value through `scheduler` instead of synchronously.
    fn receive_on(self, scheduler: SharedScheduler) -> ReceiveOn<Self>
    where
        Self: Sized,
    {
        ReceiveOn::new(self, scheduler)
    }

    /// Write every value into `target`.
    ///
    /// Only a weak reference to `target` is held; once the property is gone
    /// the subscription turns into a no-op.
    fn assign(&self, target: &Published<Self::Output>) -> Subscription {
        let target = target.downgrade();
        self.subscribe(move |value| {
            if let Some(target) = target.upgrade() {
                target.set(value);
            }
        })
    }

    /// Erase the concrete publisher type.
    fn boxed(self) -> BoxPublisher<Self::Output>
    where
        Self: Sized,
    {
        BoxPublisher {
            inner: Arc::new(self),
        }
    }
}

impl<P: Publisher + ?Sized> PublisherExt for P {}

/// A type-erased, cheaply cloneable publisher.
pub struct BoxPublisher<T> {
    inner: Arc<dyn Publisher<Output = T>>,
}

impl<T> Clone for BoxPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Publisher for BoxPublisher<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        self.inner.subscribe_sink(sink)
    }
}
