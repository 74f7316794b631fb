use std::collections::VecDeque;
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender, unbounded};
use volcontrol::{ControlError, PlayerApi, PlayerCommand, RawSnapshot};

/// Something the fake player saw.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Fetch,
    Command(PlayerCommand),
}

/// In-memory player: serves queued states (then the last one forever) and
/// reports every call on a channel.
pub struct FakePlayer {
    states: Mutex<VecDeque<Result<RawSnapshot, ControlError>>>,
    last: Mutex<Option<RawSnapshot>>,
    calls: Sender<Call>,
}

impl FakePlayer {
    pub fn new() -> (Self, Receiver<Call>) {
        let (tx, rx) = unbounded();
        let player = Self {
            states: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: tx,
        };
        (player, rx)
    }

    pub fn push_state(&self, json: &str) {
        let raw = RawSnapshot::from_json_str(json).unwrap();
        self.states.lock().unwrap().push_back(Ok(raw));
    }

    pub fn push_raw(&self, raw: RawSnapshot) {
        self.states.lock().unwrap().push_back(Ok(raw));
    }

    pub fn push_error(&self) {
        self.states
            .lock()
            .unwrap()
            .push_back(Err(ControlError::Http("fake".into(), "refused".into())));
    }
}

impl PlayerApi for FakePlayer {
    fn fetch_state(&self) -> Result<RawSnapshot, ControlError> {
        let _ = self.calls.send(Call::Fetch);
        let next = self.states.lock().unwrap().pop_front();
        match next {
            Some(Ok(raw)) => {
                *self.last.lock().unwrap() = Some(raw.clone());
                Ok(raw)
            }
            Some(Err(err)) => Err(err),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ControlError::Http("fake".into(), "no state".into())),
        }
    }

    fn send_command(&self, command: &PlayerCommand) -> Result<(), ControlError> {
        let _ = self.calls.send(Call::Command(command.clone()));
        Ok(())
    }
}

pub fn raw(json: &str) -> RawSnapshot {
    RawSnapshot::from_json_str(json).unwrap()
}
