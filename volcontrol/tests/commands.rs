use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use volcontrol::{
    CommandDispatcher, FieldClass, PlaybackStatus, PlayerCommand, SeekParam, StateStore,
};

mod common;
use common::{Call, FakePlayer, raw};

const WAIT: Duration = Duration::from_secs(5);

fn setup(initial: &str) -> (CommandDispatcher, StateStore, Arc<FakePlayer>, Receiver<Call>) {
    let (player, calls) = FakePlayer::new();
    let player = Arc::new(player);
    let store = StateStore::new();
    store.merge(raw(initial));
    let dispatcher = CommandDispatcher::new(player.clone(), store.clone());
    (dispatcher, store, player, calls)
}

/// Collects calls up to and including the out-of-band fetch.
fn calls_until_fetch(calls: &Receiver<Call>) -> Vec<Call> {
    let mut seen = Vec::new();
    loop {
        let call = calls.recv_timeout(WAIT).expect("dispatcher thread stalled");
        let done = call == Call::Fetch;
        seen.push(call);
        if done {
            return seen;
        }
    }
}

#[test]
fn test_volume_up_clamps_and_sends_command() {
    let (dispatcher, store, player, calls) = setup(r#"{"volume": 99}"#);
    player.push_state(r#"{"volume": 100}"#);

    assert_eq!(dispatcher.change_volume(2), 100);
    assert_eq!(store.snapshot().volume(), Some(100));

    assert_eq!(
        calls_until_fetch(&calls),
        vec![Call::Command(PlayerCommand::Volume(100)), Call::Fetch]
    );
}

#[test]
fn test_volume_down_clamps_at_zero() {
    let (dispatcher, store, _player, calls) = setup(r#"{"volume": 1}"#);

    assert_eq!(dispatcher.change_volume(-5), 0);
    assert_eq!(store.snapshot().volume(), Some(0));
    assert_eq!(
        calls_until_fetch(&calls),
        vec![Call::Command(PlayerCommand::Volume(0)), Call::Fetch]
    );
}

#[test]
fn test_volume_edit_is_overwritten_by_remote() {
    let (dispatcher, store, player, calls) = setup(r#"{"volume": 40}"#);
    // the player ignored the command
    player.push_state(r#"{"volume": 40}"#);

    assert_eq!(dispatcher.change_volume(2), 42);
    calls_until_fetch(&calls);

    // the refetch is merged right after the fetch call is reported
    let deadline = std::time::Instant::now() + WAIT;
    while store.pending(FieldClass::Volume).is_some() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(store.snapshot().volume(), Some(40));
}

#[test]
fn test_toggle_play_pauses_a_playing_player() {
    let (dispatcher, store, _player, calls) = setup(r#"{"status": "play"}"#);

    assert_eq!(dispatcher.toggle_play(), PlaybackStatus::Paused);
    assert_eq!(store.snapshot().playback_status(), Some(PlaybackStatus::Paused));
    assert_eq!(
        calls_until_fetch(&calls),
        vec![Call::Command(PlayerCommand::Pause), Call::Fetch]
    );
}

#[test]
fn test_toggle_play_starts_a_stopped_player() {
    let (dispatcher, _store, _player, calls) = setup(r#"{"status": "stop"}"#);

    assert_eq!(dispatcher.toggle_play(), PlaybackStatus::Playing);
    assert_eq!(
        calls_until_fetch(&calls),
        vec![Call::Command(PlayerCommand::Play), Call::Fetch]
    );
}

#[test]
fn test_previous_and_next() {
    let (dispatcher, _store, _player, calls) = setup("{}");

    dispatcher.previous();
    assert_eq!(
        calls_until_fetch(&calls),
        vec![Call::Command(PlayerCommand::Previous), Call::Fetch]
    );

    dispatcher.next();
    assert_eq!(
        calls_until_fetch(&calls),
        vec![Call::Command(PlayerCommand::Next), Call::Fetch]
    );
}

#[test]
fn test_seek_sends_every_spelling_then_refetches() {
    let (dispatcher, store, _player, calls) = setup(r#"{"seek": 45000, "duration": 180}"#);

    assert_eq!(dispatcher.seek_relative(30.0), 75.0);
    assert_eq!(store.snapshot().times().pair(), Some((75.0, 180.0)));
    assert!(store.pending(FieldClass::Position).is_some());

    let seek = |param, value| Call::Command(PlayerCommand::Seek { param, value });
    assert_eq!(
        calls_until_fetch(&calls),
        vec![
            seek(SeekParam::Value, 75),
            seek(SeekParam::Position, 75),
            seek(SeekParam::Seek, 75000),
            seek(SeekParam::Seek, 75),
            Call::Fetch,
        ]
    );
}

#[test]
fn test_seek_survives_stale_refetch() {
    let (dispatcher, store, player, calls) = setup(r#"{"seek": 45000, "duration": 180}"#);
    // the refetch still reports the old position
    player.push_state(r#"{"seek": 46000, "duration": 180}"#);

    dispatcher.seek_relative(-30.0);
    calls_until_fetch(&calls);
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(store.snapshot().times().pair(), Some((15.0, 180.0)));
}

#[test]
fn test_seek_clamps_to_track_bounds() {
    let (dispatcher, _store, _player, _calls) = setup(r#"{"seek": 170000, "duration": 180}"#);
    assert_eq!(dispatcher.seek_relative(30.0), 180.0);

    let (dispatcher, _store, _player, _calls) = setup(r#"{"seek": 10000, "duration": 180}"#);
    assert_eq!(dispatcher.seek_relative(-30.0), 0.0);
}
