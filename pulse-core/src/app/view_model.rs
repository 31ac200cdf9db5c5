//! View Model
//!
//! Composes the reactive primitives into the state a presentation layer
//! renders:
//!
//! - `text` is the raw text-field value. Its debounced character count
//!   drives `text_valid`.
//! - `button_enabled` is a debounced gate over the latest `text` and
//!   `text_valid`: enabled once the text is long enough *and* validated.
//! - `timer` mirrors a [`TimerPublisher`] that the user can start, stop or
//!   toggle.
//! - Three logs accumulate everything the [`DataService`] publishers send.
//! - `image` holds the decoded asset of the current selection, if any.
//!
//! # Ownership
//!
//! All state lives in an `Arc<ViewState>`. Sinks only capture a `Weak`
//! reference to it, so a callback never keeps the view state alive and turns
//! into a no-op once the view model is gone. The subscriptions themselves are
//! owned by the view model's [`SubscriptionSet`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::asset::{decode_image, AssetLoader, ImageAsset, SelectionToken};
use super::data_service::DataService;
use super::event_log::EventLog;
use crate::config::PulseConfig;
use crate::error::ConfigError;
use crate::reactive::{
    Projected, Published, Publisher, PublisherExt, Subscription, SubscriptionSet, TimerPublisher,
};
use crate::schedule::{SharedScheduler, Timestamp};

struct ViewState {
    text: Published<String>,
    text_valid: Published<bool>,
    button_enabled: Published<bool>,
    timer: Published<Option<Timestamp>>,
    selection: Published<Option<SelectionToken>>,
    image: Published<Option<ImageAsset>>,
    basic_log: Published<EventLog<String>>,
    current_value_log: Published<EventLog<String>>,
    passthrough_log: Published<EventLog<String>>,
}

impl ViewState {
    fn new(log_capacity: Option<usize>) -> Self {
        Self {
            text: Published::new(String::new()),
            text_valid: Published::new(false),
            button_enabled: Published::new(false),
            timer: Published::new(None),
            selection: Published::new(None),
            image: Published::new(None),
            basic_log: Published::new(EventLog::with_capacity(log_capacity)),
            current_value_log: Published::new(EventLog::with_capacity(log_capacity)),
            passthrough_log: Published::new(EventLog::with_capacity(log_capacity)),
        }
    }
}

/// Point-in-time copy of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSnapshot {
    pub text: String,
    pub text_valid: bool,
    pub button_enabled: bool,
    pub timer: Option<Timestamp>,
    pub timer_running: bool,
    pub selection: Option<SelectionToken>,
    pub image: Option<ImageAsset>,
    pub basic_log: Vec<String>,
    pub current_value_log: Vec<String>,
    pub passthrough_log: Vec<String>,
}

impl ViewSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub struct ViewModel {
    state: Arc<ViewState>,
    config: PulseConfig,
    scheduler: SharedScheduler,
    service: DataService,
    timer: TimerPublisher,
    subscriptions: Mutex<SubscriptionSet>,
    _timer_link: Subscription,
    asset_loader: Option<Arc<dyn AssetLoader>>,
    selection_generation: AtomicU64,
}

impl ViewModel {
    /// Build the view model, wire every pipeline and start the data service
    /// (and the timer, when configured to autostart).
    ///
    /// Fails if `config` does not pass [`PulseConfig::validate`].
    pub fn new(config: PulseConfig, scheduler: SharedScheduler) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = Arc::new(ViewState::new(config.data_service.log_capacity));
        let timer = TimerPublisher::new(config.timer.interval(), Arc::clone(&scheduler));
        let timer_link = timer.assign(&state.timer);

        let view_model = Self {
            state,
            service: DataService::new(config.data_service.clone()),
            config,
            scheduler,
            timer,
            subscriptions: Mutex::new(SubscriptionSet::new()),
            _timer_link: timer_link,
            asset_loader: None,
            selection_generation: AtomicU64::new(0),
        };

        view_model.subscribe_text_field();
        view_model.subscribe_enabled_gate();
        view_model.subscribe_data_service();

        if view_model.config.timer.autostart {
            view_model.timer.start();
        }
        if let Err(error) = view_model.service.start(view_model.scheduler.as_ref()) {
            warn!(%error, "data service could not be started");
        }

        Ok(view_model)
    }

    /// Attach the loader used by [`select_asset`](Self::select_asset).
    pub fn with_asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.asset_loader = Some(loader);
        self
    }

    /// Subscribe `publisher`, applying each value to the view state while it
    /// is alive.
    fn bind<P, F>(&self, publisher: &P, apply: F)
    where
        P: Publisher,
        F: Fn(&ViewState, P::Output) + Send + Sync + 'static,
    {
        let state = Arc::downgrade(&self.state);
        let subscription = publisher.subscribe(move |value| {
            if let Some(state) = state.upgrade() {
                apply(&state, value);
            }
        });
        self.subscriptions.lock().insert(subscription);
    }

    fn subscribe_text_field(&self) {
        let above = self.config.validation.valid_length_above;
        let validity = self
            .state
            .text
            .publisher()
            .debounce(self.config.validation.debounce(), Arc::clone(&self.scheduler))
            .map(move |text: String| text.chars().count() > above);

        self.bind(&validity, |state, valid| state.text_valid.set(valid));
    }

    fn subscribe_enabled_gate(&self) {
        let above = self.config.validation.enabled_length_above;
        let gate = self
            .state
            .text
            .publisher()
            .combine_latest(self.state.text_valid.publisher())
            .debounce(self.config.validation.debounce(), Arc::clone(&self.scheduler));

        self.bind(&gate, move |state, (text, valid): (String, bool)| {
            state
                .button_enabled
                .set(text.chars().count() > above && valid);
        });
    }

    fn subscribe_data_service(&self) {
        self.bind(&self.service.basic(), |state, value| {
            state.basic_log.update(|log| log.push(value));
        });
        self.bind(self.service.current_value(), |state, value| {
            state.current_value_log.update(|log| log.push(value));
        });
        self.bind(self.service.passthrough(), |state, value| {
            state.passthrough_log.update(|log| log.push(value));
        });
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    pub fn set_text(&self, text: impl Into<String>) {
        self.state.text.set(text.into());
    }

    pub fn start_timer(&self) {
        self.timer.start();
    }

    pub fn stop_timer(&self) {
        self.timer.stop();
    }

    pub fn toggle_timer(&self) {
        self.timer.toggle();
    }

    /// Tear down every pipeline except the timer.
    pub fn stop_subscriptions(&self) {
        let mut subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        debug!(count = subscriptions.len(), "stopping subscriptions");
        subscriptions.clear();
    }

    /// Select an asset (or clear the selection) and load its image.
    ///
    /// Any failure leaves the image empty. If another selection is made while
    /// this one is still loading, this result is discarded.
    pub async fn select_asset(&self, selection: Option<SelectionToken>) {
        let generation = self.selection_generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.selection.set(selection.clone());

        let Some(token) = selection else {
            self.state.image.set(None);
            return;
        };

        let image = match &self.asset_loader {
            Some(loader) => match loader.load(&token).await {
                Ok(Some(bytes)) => {
                    let image = decode_image(&bytes);
                    if image.is_none() {
                        warn!(token = %token, "selected asset is not a recognised image");
                    }
                    image
                }
                Ok(None) => {
                    debug!(token = %token, "selected asset has no data");
                    None
                }
                Err(error) => {
                    warn!(%error, "asset load failed");
                    None
                }
            },
            None => {
                warn!(token = %token, "no asset loader configured");
                None
            }
        };

        if self.selection_generation.load(Ordering::Acquire) != generation {
            trace!(token = %token, "discarding stale asset load");
            return;
        }
        self.state.image.set(image);
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn text(&self) -> String {
        self.state.text.get()
    }

    pub fn is_text_valid(&self) -> bool {
        self.state.text_valid.get()
    }

    pub fn is_button_enabled(&self) -> bool {
        self.state.button_enabled.get()
    }

    pub fn timer_value(&self) -> Option<Timestamp> {
        self.state.timer.get()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn timer(&self) -> &TimerPublisher {
        &self.timer
    }

    pub fn selection(&self) -> Option<SelectionToken> {
        self.state.selection.get()
    }

    pub fn image(&self) -> Option<ImageAsset> {
        self.state.image.get()
    }

    pub fn basic_log(&self) -> Vec<String> {
        self.state.basic_log.get().to_vec()
    }

    pub fn current_value_log(&self) -> Vec<String> {
        self.state.current_value_log.get().to_vec()
    }

    pub fn passthrough_log(&self) -> Vec<String> {
        self.state.passthrough_log.get().to_vec()
    }

    /// Number of live pipelines, excluding the timer.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn text_publisher(&self) -> Projected<String> {
        self.state.text.publisher()
    }

    pub fn text_valid_publisher(&self) -> Projected<bool> {
        self.state.text_valid.publisher()
    }

    pub fn button_enabled_publisher(&self) -> Projected<bool> {
        self.state.button_enabled.publisher()
    }

    pub fn timer_publisher(&self) -> Projected<Option<Timestamp>> {
        self.state.timer.publisher()
    }

    pub fn image_publisher(&self) -> Projected<Option<ImageAsset>> {
        self.state.image.publisher()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            text: self.text(),
            text_valid: self.is_text_valid(),
            button_enabled: self.is_button_enabled(),
            timer: self.timer_value(),
            timer_running: self.is_timer_running(),
            selection: self.selection(),
            image: self.image(),
            basic_log: self.basic_log(),
            current_value_log: self.current_value_log(),
            passthrough_log: self.passthrough_log(),
        }
    }
}

impl Drop for ViewModel {
    fn drop(&mut self) {
        self.service.cancel();
        self.timer.stop();
        self.subscriptions.get_mut().clear();
    }
}
