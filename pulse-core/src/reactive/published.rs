//! Published Properties
//!
//! A [`Published`] value is a piece of owner-writable state that announces
//! every change. It is the building block view models use to expose state to
//! a presentation layer.
//!
//! # How Published Works
//!
//! 1. The owner reads with [`get`](Published::get) and writes with
//!    [`set`](Published::set) or [`update`](Published::update).
//!
//! 2. Every write stores the new value first and then synchronously notifies
//!    subscribers, so a subscriber that reads the property back observes the
//!    value it was handed.
//!
//! 3. Readers get a [`Projected`] publisher: it replays the current value on
//!    subscribe like any stateful publisher but cannot write, which keeps the
//!    owner the single writer.
//!
//! # Ownership
//!
//! `Published` is a handle; clones share the same state. Callbacks that must
//! not keep a property alive hold a [`WeakPublished`] instead.

use std::fmt;
use std::sync::Weak;

use super::publisher::{Publisher, Sink};
use super::subject::{CurrentValueSubject, PublisherId, SubjectCore};
use super::subscription::Subscription;

/// Owner-writable state that publishes every change.
///
/// # Example
///
/// ```rust,ignore
/// let text = Published::new(String::new());
/// let _sub = text.publisher().subscribe(|t| println!("text is now {t:?}"));
///
/// text.set("abc".into());
/// text.update(|t| t.push('d'));
/// assert_eq!(text.get(), "abcd");
/// ```
pub struct Published<T> {
    subject: CurrentValueSubject<T>,
}

impl<T> Published<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a property with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            subject: CurrentValueSubject::new(value),
        }
    }

    pub fn id(&self) -> PublisherId {
        self.subject.id()
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.subject.value()
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        self.subject.send(value);
    }

    /// Modify the value in place, then notify subscribers once.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let mut value = self.subject.value();
        f(&mut value);
        self.set(value);
    }

    /// A read-only publisher of this property's values.
    pub fn publisher(&self) -> Projected<T> {
        Projected {
            subject: self.subject.clone(),
        }
    }

    /// A handle that does not keep the property alive.
    pub fn downgrade(&self) -> WeakPublished<T> {
        WeakPublished {
            core: self.subject.downgrade_core(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subject.subscriber_count()
    }
}

impl<T> Clone for Published<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
        }
    }
}

impl<T> Default for Published<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Published<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Published")
            .field("id", &self.id())
            .field("value", &self.get())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Read-only view of a [`Published`] property.
pub struct Projected<T> {
    subject: CurrentValueSubject<T>,
}

impl<T> Projected<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn value(&self) -> T {
        self.subject.value()
    }
}

impl<T> Clone for Projected<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
        }
    }
}

impl<T> Publisher for Projected<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        self.subject.subscribe_sink(sink)
    }
}

/// Non-owning reference to a [`Published`] property.
pub struct WeakPublished<T> {
    core: Weak<SubjectCore<T>>,
}

impl<T> WeakPublished<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The property, if it is still alive.
    pub fn upgrade(&self) -> Option<Published<T>> {
        self.core.upgrade().map(|core| Published {
            subject: CurrentValueSubject::from_core(core),
        })
    }
}

impl<T> Clone for WeakPublished<T> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}
