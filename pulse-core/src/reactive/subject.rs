//! Subject Implementation
//!
//! Subjects are the publishers values are pushed into. Two flavours share one
//! core:
//!
//! - [`CurrentValueSubject`] retains its latest value, requires an initial
//!   value and replays the latest value to every new subscriber before
//!   `subscribe` returns.
//! - [`PassthroughSubject`] retains nothing; subscribers only see values sent
//!   while they are attached.
//!
//! # Delivery
//!
//! `send` delivers synchronously to every active sink in subscription order.
//! No lock is held while a sink runs, so a sink may subscribe, cancel (itself
//! or others) or send again. A send issued while the same subject is already
//! delivering is queued and delivered once the current pass completes, which
//! keeps the per-subscriber order identical to the order of `send` calls.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use super::publisher::{Publisher, Sink};
use super::subscription::{SubscriberId, Subscription, SubscriptionState};

/// Unique identifier for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublisherId(u64);

impl PublisherId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct Entry<T> {
    sink: Sink<T>,
    state: Arc<SubscriptionState>,
    /// Sequence number of the last send issued before this entry attached.
    since: u64,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
            since: self.since,
        }
    }
}

struct Registry<T> {
    /// Latest value; always `Some` for retaining subjects, always `None`
    /// otherwise.
    current: Option<T>,
    sinks: IndexMap<SubscriberId, Entry<T>>,
    /// Sequence number of the latest send.
    sent: u64,
    delivering: bool,
    queued: VecDeque<(u64, T)>,
}

/// Shared state behind both subject flavours.
pub(crate) struct SubjectCore<T> {
    id: PublisherId,
    retains: bool,
    registry: Mutex<Registry<T>>,
}

/// Resets the delivery flag when a sink panics.
///
/// On the normal path the flag is cleared by the delivery loop itself, under
/// the same lock that observed the empty queue.
struct DeliveryGuard<'a, T> {
    core: &'a SubjectCore<T>,
}

impl<T> Drop for DeliveryGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut registry = self.core.registry.lock();
            registry.delivering = false;
            registry.queued.clear();
        }
    }
}

impl<T> SubjectCore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(initial: Option<T>) -> Arc<Self> {
        Arc::new(Self {
            id: PublisherId::next(),
            retains: initial.is_some(),
            registry: Mutex::new(Registry {
                current: initial,
                sinks: IndexMap::new(),
                sent: 0,
                delivering: false,
                queued: VecDeque::new(),
            }),
        })
    }

    fn subscribe(self: &Arc<Self>, sink: Sink<T>) -> Subscription {
        let id = SubscriberId::new();
        let publisher = self.id;
        // Non-owning back-reference: a live subscription never keeps its
        // subject alive.
        let weak: Weak<Self> = Arc::downgrade(self);
        let subscription = Subscription::with_id(id, move || {
            if let Some(core) = weak.upgrade() {
                core.remove(id);
            }
        });

        let replay = {
            let mut registry = self.registry.lock();
            // Sends already queued behind the running delivery are covered by
            // the replayed value; the new entry only sees later sends.
            let since = registry.sent;
            registry.sinks.insert(
                id,
                Entry {
                    sink: Arc::clone(&sink),
                    state: subscription.state(),
                    since,
                },
            );
            registry.current.clone()
        };

        trace!(
            publisher = publisher.raw(),
            subscriber = id.raw(),
            replay = replay.is_some(),
            "subscribed"
        );

        if let Some(value) = replay {
            sink(value);
        }
        subscription
    }

    fn remove(&self, id: SubscriberId) {
        self.registry.lock().sinks.shift_remove(&id);
    }

    fn send(&self, value: T) {
        let mut next = {
            let mut registry = self.registry.lock();
            if self.retains {
                registry.current = Some(value.clone());
            }
            registry.sent += 1;
            let seq = registry.sent;
            if registry.delivering {
                registry.queued.push_back((seq, value));
                return;
            }
            registry.delivering = true;
            (seq, value)
        };

        let _guard = DeliveryGuard { core: self };
        loop {
            let (seq, value) = next;
            let entries: SmallVec<[Entry<T>; 4]> =
                self.registry.lock().sinks.values().cloned().collect();

            for entry in entries {
                if entry.since < seq && entry.state.is_active() {
                    (entry.sink)(value.clone());
                }
            }

            let mut registry = self.registry.lock();
            match registry.queued.pop_front() {
                Some(queued) => next = queued,
                None => {
                    registry.delivering = false;
                    break;
                }
            }
        }
    }

    fn current(&self) -> Option<T> {
        self.registry.lock().current.clone()
    }

    fn subscriber_count(&self) -> usize {
        self.registry.lock().sinks.len()
    }
}

/// A stateful subject: retains and replays its latest value.
///
/// # Example
///
/// ```rust,ignore
/// let subject = CurrentValueSubject::new(String::new());
/// let _sub = subject.subscribe(|v| println!("got {v:?}")); // prints ""
/// subject.send("Hello".to_string());                        // prints "Hello"
/// ```
pub struct CurrentValueSubject<T> {
    core: Arc<SubjectCore<T>>,
}

impl<T> CurrentValueSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            core: SubjectCore::new(Some(initial)),
        }
    }

    pub fn id(&self) -> PublisherId {
        self.core.id
    }

    /// The latest value sent (or the initial value).
    pub fn value(&self) -> T {
        match self.core.current() {
            Some(value) => value,
            None => unreachable!("retaining subject without a value"),
        }
    }

    /// Store `value` and deliver it to every active subscriber.
    pub fn send(&self, value: T) {
        self.core.send(value);
    }

    pub fn subscriber_count(&self) -> usize {
        self.core.subscriber_count()
    }

    pub(crate) fn downgrade_core(&self) -> Weak<SubjectCore<T>> {
        Arc::downgrade(&self.core)
    }

    pub(crate) fn from_core(core: Arc<SubjectCore<T>>) -> Self {
        Self { core }
    }
}

impl<T> Clone for CurrentValueSubject<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Publisher for CurrentValueSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        self.core.subscribe(sink)
    }
}

impl<T> fmt::Debug for CurrentValueSubject<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentValueSubject")
            .field("id", &self.core.id)
            .field("value", &self.core.current())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// An ephemeral subject: forwards values, retains nothing.
pub struct PassthroughSubject<T> {
    core: Arc<SubjectCore<T>>,
}

impl<T> PassthroughSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            core: SubjectCore::new(None),
        }
    }

    pub fn id(&self) -> PublisherId {
        self.core.id
    }

    /// Deliver `value` to the subscribers attached right now.
    pub fn send(&self, value: T) {
        self.core.send(value);
    }

    pub fn subscriber_count(&self) -> usize {
        self.core.subscriber_count()
    }
}

impl<T> Default for PassthroughSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PassthroughSubject<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Publisher for PassthroughSubject<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        self.core.subscribe(sink)
    }
}

impl<T> fmt::Debug for PassthroughSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassthroughSubject")
            .field("id", &self.core.id)
            .field("subscriber_count", &self.core.registry.lock().sinks.len())
            .finish()
    }
}
