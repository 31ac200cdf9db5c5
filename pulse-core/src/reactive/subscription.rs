//! Subscription handles.
//!
//! A [`Subscription`] represents one sink's attachment to a publisher. It owns
//! whatever is needed to keep values flowing (for derived publishers, the
//! upstream subscriptions and any pending scheduled work) and releases all of
//! it on cancellation. Cancellation happens at most once: explicitly through
//! [`Subscription::cancel`], when the handle is dropped, or when the owning
//! [`SubscriptionSet`] is cleared.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

/// Unique identifier for a subscription.
///
/// Publishers key their sink registry by this ID, which also fixes the
/// delivery order: IDs are handed out in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Shared cancellation state of one subscription.
///
/// Publishers keep an `Arc` to it next to the sink so that a sink cancelled
/// midway through a delivery pass is skipped for the rest of that pass.
pub(crate) struct SubscriptionState {
    id: SubscriberId,
    cancelled: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
}

impl SubscriptionState {
    pub(crate) fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `true` if this call performed the cancellation.
    fn cancel(&self) -> bool {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Take the teardown out before running it: it may cancel other
        // subscriptions or re-enter a publisher.
        let teardown = self.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
        trace!(subscriber = self.id.raw(), "subscription cancelled");
        true
    }
}

/// A cancellable attachment of a sink to a publisher.
///
/// Dropping the handle cancels the subscription, so keep it alive (or store
/// it in a [`SubscriptionSet`]) for as long as values should arrive.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    state: Arc<SubscriptionState>,
}

impl Subscription {
    /// Create a subscription that runs `teardown` when cancelled.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_id(SubscriberId::new(), teardown)
    }

    pub(crate) fn with_id<F>(id: SubscriberId, teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            state: Arc::new(SubscriptionState {
                id,
                cancelled: AtomicBool::new(false),
                teardown: Mutex::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self::new(|| {})
    }

    pub fn id(&self) -> SubscriberId {
        self.state.id
    }

    pub fn is_cancelled(&self) -> bool {
        !self.state.is_active()
    }

    /// Stop delivery and release upstream resources.
    ///
    /// Safe to call more than once and from inside the subscription's own
    /// sink; only the first call has any effect.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Hand ownership of this subscription to `set`.
    pub fn store_in(self, set: &mut SubscriptionSet) {
        set.insert(self);
    }

    pub(crate) fn state(&self) -> Arc<SubscriptionState> {
        Arc::clone(&self.state)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.state.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.state.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A collection of subscriptions torn down together.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    members: SmallVec<[Subscription; 8]>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subscription: Subscription) {
        self.members.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Cancel every member, in insertion order, and empty the set.
    pub fn clear(&mut self) {
        for subscription in self.members.drain(..) {
            subscription.cancel();
        }
    }
}

impl Extend<Subscription> for SubscriptionSet {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.members.extend(iter);
    }
}

impl FromIterator<Subscription> for SubscriptionSet {
    fn from_iter<I: IntoIterator<Item = Subscription>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    fn counting() -> (Arc<AtomicI32>, Subscription) {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let subscription = Subscription::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, subscription)
    }

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
        assert!(id1 < id2 && id2 < id3);
    }

    #[test]
    fn cancel_is_idempotent() {
        let (count, subscription) = counting();

        assert!(!subscription.is_cancelled());
        subscription.cancel();
        subscription.cancel();

        assert!(subscription.is_cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Dropping after an explicit cancel does not tear down again.
        drop(subscription);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_cancels() {
        let (count, subscription) = counting();
        drop(subscription);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clearing_a_set_cancels_each_member_once() {
        let (first, a) = counting();
        let (second, b) = counting();

        let mut set = SubscriptionSet::new();
        a.store_in(&mut set);
        set.insert(b);
        assert_eq!(set.len(), 2);

        set.clear();
        assert!(set.is_empty());
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        set.clear();
        assert_eq!(first.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn teardown_may_cancel_other_subscriptions() {
        let (inner_count, inner) = counting();
        let outer = Subscription::new(move || inner.cancel());

        outer.cancel();
        assert_eq!(inner_count.load(Ordering::SeqCst), 1);
    }
}
