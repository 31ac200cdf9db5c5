//! Reactive Primitives
//!
//! This module implements the publisher/subscriber core: subjects that values
//! are pushed into, operators that derive new publishers, a restartable timer,
//! and the subscription handles that tie sinks to sources.
//!
//! # Concepts
//!
//! ## Publishers
//!
//! A [`Publisher`] emits values over time to zero or more sinks. Stateful
//! publishers ([`CurrentValueSubject`], [`Published`]) retain their latest
//! value and replay it to every new subscriber; ephemeral ones
//! ([`PassthroughSubject`]) only forward values to sinks attached at the
//! moment of the send.
//!
//! ## Operators
//!
//! [`PublisherExt`] provides `map`, `debounce`, `combine_latest`,
//! `receive_on`, `assign` and `boxed`. Each operator returns a new publisher;
//! operators are cold, so every subscription builds its own pipeline state.
//!
//! ## Subscriptions
//!
//! Subscribing returns a [`Subscription`]. It stays live until cancelled,
//! dropped, or cleared from a [`SubscriptionSet`]. Cancellation is
//! idempotent and safe from within a sink.
//!
//! # Implementation Notes
//!
//! Delivery is synchronous and happens on the caller's thread. Deferred work
//! (debounce windows, timer ticks, `receive_on`) goes through a
//! [`Scheduler`](crate::schedule::Scheduler), which stands for the single
//! context all sinks are expected to run on.

mod operators;
mod publisher;
mod published;
mod subject;
mod subscription;
mod timer;

pub use operators::{CombineLatest, Debounce, Map, ReceiveOn};
pub use publisher::{BoxPublisher, Publisher, PublisherExt, Sink};
pub use published::{Projected, Published, WeakPublished};
pub use subject::{CurrentValueSubject, PassthroughSubject, PublisherId};
pub use subscription::{SubscriberId, Subscription, SubscriptionSet};
pub use timer::{TimerCompletion, TimerPhase, TimerPublisher};
