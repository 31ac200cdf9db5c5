//! Integration Tests for the Reactive Core
//!
//! These tests drive publishers, operators and the view model together on a
//! virtual clock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use pulse_core::app::ViewModel;
use pulse_core::reactive::{
    CurrentValueSubject, PassthroughSubject, Published, Publisher, PublisherExt, Subscription,
    SubscriptionSet, TimerPublisher,
};
use pulse_core::schedule::{Scheduler, Timestamp, VirtualScheduler};
use pulse_core::PulseConfig;

fn record<P: Publisher>(publisher: &P) -> (Arc<Mutex<Vec<P::Output>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let subscription = publisher.subscribe(move |value| seen_clone.lock().push(value));
    (seen, subscription)
}

/// A stateful publisher hands its initial value to a fresh subscriber first.
#[test]
fn stateful_publisher_delivers_initial_value_first() {
    let subject = CurrentValueSubject::new("v0");
    let (seen, _sub) = record(&subject);
    assert_eq!(*seen.lock(), vec!["v0"]);

    subject.send("v1");
    assert_eq!(*seen.lock(), vec!["v0", "v1"]);
}

/// An ephemeral publisher stays silent until the next send.
#[test]
fn ephemeral_publisher_waits_for_next_send() {
    let subject = PassthroughSubject::new();
    let (seen, _sub) = record(&subject);
    assert!(seen.lock().is_empty());

    subject.send(1);
    assert_eq!(*seen.lock(), vec![1]);
}

/// Debounce with timestamps observed on the virtual clock.
#[test]
fn debounce_emits_once_per_quiet_period() {
    let scheduler = Arc::new(VirtualScheduler::new());
    let source = PassthroughSubject::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let clock = Arc::clone(&scheduler);
    let seen_clone = Arc::clone(&seen);
    let _sub = source
        .clone()
        .debounce(Duration::from_millis(500), scheduler.clone())
        .subscribe(move |v| seen_clone.lock().push((clock.now(), v)));

    for (at, value) in [(0, "t0"), (100, "t0.1"), (200, "t0.2")] {
        scheduler.advance_to(Timestamp::from_millis(at));
        source.send(value);
    }
    scheduler.advance_to(Timestamp::from_millis(1300));
    assert_eq!(*seen.lock(), vec![(Timestamp::from_millis(700), "t0.2")]);

    source.send("t1.3");
    scheduler.advance_to(Timestamp::from_millis(2000));
    assert_eq!(
        *seen.lock(),
        vec![
            (Timestamp::from_millis(700), "t0.2"),
            (Timestamp::from_millis(1800), "t1.3"),
        ]
    );
}

#[test]
fn combine_latest_pairs_most_recent_values() {
    let a = PassthroughSubject::new();
    let b = PassthroughSubject::new();
    let (seen, _sub) = record(&a.clone().combine_latest(b.clone()));

    a.send("x");
    assert!(seen.lock().is_empty());
    b.send("y");
    a.send("z");
    b.send("w");

    assert_eq!(*seen.lock(), vec![("x", "y"), ("z", "y"), ("z", "w")]);
}

#[test]
fn double_cancel_is_silent() {
    let subject = PassthroughSubject::new();
    let (seen, sub) = record(&subject);

    subject.send(1);
    sub.cancel();
    sub.cancel();
    subject.send(2);

    assert_eq!(*seen.lock(), vec![1]);
}

#[test]
fn subscription_set_tears_down_a_whole_pipeline() {
    let scheduler = Arc::new(VirtualScheduler::new());
    let text = Published::new(String::new());
    let flag = CurrentValueSubject::new(true);
    let mut set = SubscriptionSet::new();

    let (lengths, sub) = record(&text.publisher().map(|t: String| t.len()));
    sub.store_in(&mut set);
    let (pairs, sub) = record(
        &text
            .publisher()
            .combine_latest(flag.clone())
            .debounce(Duration::from_millis(100), scheduler.clone()),
    );
    set.insert(sub);

    text.set("abc".into());
    set.clear();
    scheduler.advance_by(Duration::from_secs(1));
    text.set("abcdef".into());

    assert_eq!(*lengths.lock(), vec![0, 3]);
    assert!(pairs.lock().is_empty());
    assert_eq!(flag.subscriber_count(), 0);
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn restarted_timer_ticks_from_the_restart() {
    let scheduler = Arc::new(VirtualScheduler::new());
    let timer = TimerPublisher::new(Duration::from_secs(1), scheduler.clone());
    let (seen, _sub) = record(&timer);

    timer.start();
    scheduler.advance_to(Timestamp::from_millis(300));
    timer.stop();
    scheduler.advance_to(Timestamp::from_millis(500));
    timer.start();
    scheduler.advance_to(Timestamp::from_millis(1600));

    assert_eq!(
        *seen.lock(),
        vec![None, None, Some(Timestamp::from_millis(1500))]
    );
}

/// Full scenario: a typing burst settles into a valid, enabled form.
#[test]
fn view_model_settles_after_typing_burst() {
    let scheduler = Arc::new(VirtualScheduler::new());
    let mut config = PulseConfig::default();
    config.timer.autostart = false;
    let vm = ViewModel::new(config, scheduler.clone()).unwrap();

    let (enabled, _sub) = record(&vm.button_enabled_publisher());

    for (at, text) in [(0, "a"), (100, "ab"), (200, "abcd"), (300, "abcdef")] {
        scheduler.advance_to(Timestamp::from_millis(at));
        vm.set_text(text);
    }

    scheduler.advance_to(Timestamp::from_millis(799));
    assert!(!vm.is_text_valid());

    scheduler.advance_to(Timestamp::from_millis(800));
    assert!(vm.is_text_valid());
    assert!(!vm.is_button_enabled());

    scheduler.advance_to(Timestamp::from_millis(1300));
    assert!(vm.is_button_enabled());
    assert_eq!(enabled.lock().last(), Some(&true));

    let snapshot = vm.snapshot();
    assert_eq!(snapshot.passthrough_log, vec!["Hello", "World"]);
    assert_eq!(snapshot.basic_log, vec!["", "Hello", "World"]);
}

#[test]
fn view_model_absorbs_a_dead_scheduler() {
    let scheduler = Arc::new(VirtualScheduler::new());
    scheduler.shutdown();
    let vm = ViewModel::new(PulseConfig::default(), scheduler.clone()).unwrap();

    vm.set_text("abcdefgh");
    scheduler.advance_by(Duration::from_secs(5));

    assert!(!vm.is_timer_running());
    assert_eq!(vm.timer_value(), None);
    assert!(!vm.is_text_valid());
    assert!(vm.passthrough_log().is_empty());
    assert_eq!(vm.basic_log(), vec![""]);
}
