//! Demo data service.
//!
//! Owns one publisher of each stateful/ephemeral flavour and feeds all three
//! the same fixed list of strings on a fixed schedule, so that a consumer can
//! observe how each flavour fans out to its subscribers:
//!
//! - `basic`: a [`Published`] property, initial value `""`.
//! - `current_value`: a [`CurrentValueSubject`], initial value `""`.
//! - `passthrough`: a [`PassthroughSubject`], no initial value.
//!
//! Value `i` is sent at `i * step` after [`DataService::start`]. Sends are
//! always deferred through the scheduler, even the first one, so subscribers
//! attached right after `start` still see every send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::DataServiceConfig;
use crate::error::SchedulerError;
use crate::reactive::{CurrentValueSubject, PassthroughSubject, Projected, Published};
use crate::schedule::{ScheduledHandle, Scheduler};

pub struct DataService {
    config: DataServiceConfig,
    basic: Published<String>,
    current_value: CurrentValueSubject<String>,
    passthrough: PassthroughSubject<String>,
    scheduled: Mutex<Vec<ScheduledHandle>>,
    started: AtomicBool,
}

impl DataService {
    pub fn new(config: DataServiceConfig) -> Self {
        Self {
            config,
            basic: Published::new(String::new()),
            current_value: CurrentValueSubject::new(String::new()),
            passthrough: PassthroughSubject::new(),
            scheduled: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Schedule every send.
    ///
    /// The three publishers are scheduled one after another, so sends due at
    /// the same instant reach `basic`, `current_value` and `passthrough` in
    /// that order.
    ///
    /// The schedule is planned once; later calls return `Ok(())` without
    /// scheduling anything. A failed start may be retried.
    pub fn start(&self, scheduler: &dyn Scheduler) -> Result<(), SchedulerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("data service already started");
            return Ok(());
        }

        let basic = self.basic.clone();
        let current_value = self.current_value.clone();
        let passthrough = self.passthrough.clone();
        let senders: [Arc<dyn Fn(String) + Send + Sync>; 3] = [
            Arc::new(move |value| basic.set(value)),
            Arc::new(move |value| current_value.send(value)),
            Arc::new(move |value| passthrough.send(value)),
        ];

        let step = self.config.step();
        let mut handles = Vec::with_capacity(self.config.values.len() * senders.len());

        for sender in &senders {
            for (index, value) in self.config.values.iter().enumerate() {
                let sender = Arc::clone(sender);
                let value = value.clone();
                let scheduled = u32::try_from(index)
                    .ok()
                    .and_then(|index| step.checked_mul(index))
                    .ok_or(SchedulerError::DelayOverflow)
                    .and_then(|delay| scheduler.after(delay, Box::new(move || sender(value))));
                match scheduled {
                    Ok(handle) => handles.push(handle),
                    Err(error) => {
                        for handle in handles {
                            handle.cancel();
                        }
                        self.started.store(false, Ordering::Release);
                        return Err(error);
                    }
                }
            }
        }

        debug!(
            sends = handles.len(),
            step_ms = step.as_millis() as u64,
            "data service schedule planned"
        );
        self.scheduled.lock().extend(handles);
        Ok(())
    }

    /// Cancel every send that has not happened yet.
    pub fn cancel(&self) {
        for handle in self.scheduled.lock().drain(..) {
            handle.cancel();
        }
    }

    pub fn basic(&self) -> Projected<String> {
        self.basic.publisher()
    }

    pub fn current_value(&self) -> &CurrentValueSubject<String> {
        &self.current_value
    }

    pub fn passthrough(&self) -> &PassthroughSubject<String> {
        &self.passthrough
    }
}

impl Drop for DataService {
    fn drop(&mut self) {
        self.cancel();
    }
}
