//! Pulse Core
//!
//! This crate provides the core runtime for the Pulse reactive-streams
//! toolkit. It implements:
//!
//! - Publishers (stateful, pass-through, published properties, timers)
//! - Operators (map, debounce, combine-latest, receive-on)
//! - Cancellable subscriptions and subscription sets
//! - Deterministic and tokio-backed schedulers
//! - A demo application layer composing all of the above
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Publisher/subscriber primitives and operators
//! - `schedule`: Clocks that run deferred work on the delivery context
//! - `app`: Data service and view model built on the primitives
//! - `config`: JSON-loadable configuration for the application layer
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use pulse_core::reactive::{Published, PublisherExt};
//! use pulse_core::schedule::VirtualScheduler;
//!
//! let scheduler = Arc::new(VirtualScheduler::new());
//! let text = Published::new(String::new());
//!
//! // Validate the text once typing pauses for half a second.
//! let _sub = text
//!     .publisher()
//!     .debounce(Duration::from_millis(500), scheduler.clone())
//!     .map(|t: String| t.chars().count() > 3)
//!     .subscribe(|valid| println!("valid: {valid}"));
//!
//! text.set("abcd".into());
//! scheduler.advance_by(Duration::from_millis(500));
//! // prints "valid: true"
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod reactive;
pub mod schedule;

pub use config::PulseConfig;
pub use error::{Error, Result};
