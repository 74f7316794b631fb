use std::sync::Arc;
use std::time::Duration;

use volcontrol::{Poller, RawSnapshot, StateStore, poll_once};

mod common;
use common::{Call, FakePlayer, raw};

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_poll_once_merges_state() {
    let (player, _calls) = FakePlayer::new();
    player.push_state(r#"{"title": "Blue in Green", "volume": 25}"#);
    let store = StateStore::new();

    assert!(poll_once(&player, &store).is_some());
    assert_eq!(store.snapshot().title().as_deref(), Some("Blue in Green"));
}

#[test]
fn test_poll_once_skips_failures() {
    let (player, _calls) = FakePlayer::new();
    player.push_state(r#"{"title": "kept"}"#);
    player.push_error();
    player.push_raw(RawSnapshot::from("garbage"));
    let store = StateStore::new();

    poll_once(&player, &store);
    let before = store.snapshot();

    assert!(poll_once(&player, &store).is_none());
    assert!(poll_once(&player, &store).is_none());
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_poller_keeps_ticking_through_errors() {
    let (player, calls) = FakePlayer::new();
    player.push_error();
    player.push_error();
    player.push_state(r#"{"status": "play", "seek": 3000, "duration": 200}"#);
    let player = Arc::new(player);
    let store = StateStore::new();

    let poller = Poller::new(player, store.clone(), Duration::from_millis(10));
    poller.start();
    poller.start();
    assert!(poller.is_running());

    for _ in 0..4 {
        assert_eq!(calls.recv_timeout(WAIT), Ok(Call::Fetch));
    }
    poller.stop();
    assert!(!poller.is_running());

    let snapshot = store.snapshot();
    assert_eq!(snapshot.times().pair(), Some((3.0, 200.0)));
    assert_eq!(snapshot, {
        let expected = StateStore::new();
        expected.merge(raw(r#"{"status": "play", "seek": 3000, "duration": 200}"#));
        expected.snapshot()
    });
}

#[test]
fn test_stop_is_idempotent() {
    let (player, _calls) = FakePlayer::new();
    let poller = Poller::new(Arc::new(player), StateStore::new(), Duration::from_secs(1));
    poller.stop();
    poller.start();
    poller.stop();
    poller.stop();
    assert!(!poller.is_running());
}
