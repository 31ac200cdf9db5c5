//! Demo Application Layer
//!
//! The consumer side of the reactive core: a [`DataService`] that drives
//! three publishers on a fixed schedule and a [`ViewModel`] that composes
//! them, a debounced text check, a combine-latest gate, a timer and an
//! asynchronous asset load into state for a presentation layer.

mod asset;
mod data_service;
mod event_log;
mod view_model;

pub use asset::{
    decode_image, AssetLoader, ImageAsset, ImageFormat, InMemoryAssets, LoadFuture, SelectionToken,
};
pub use data_service::DataService;
pub use event_log::EventLog;
pub use view_model::{ViewModel, ViewSnapshot};
