//! Operators
//!
//! Derived publishers built on top of another publisher. Operators are cold:
//! every subscription to a derived publisher subscribes to its source(s)
//! anew, so per-subscriber state (a debounce window, the two slots of a
//! combine-latest) is never shared between subscribers. Cancelling the
//! derived subscription cancels the upstream ones and any pending scheduled
//! work.

mod combine_latest;
mod debounce;
mod map;
mod receive_on;

pub use combine_latest::CombineLatest;
pub use debounce::Debounce;
pub use map::Map;
pub use receive_on::ReceiveOn;
