use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use volcontrol::{CommandDispatcher, StateStore};

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    VolumeUp,
    VolumeDown,
    TogglePlay,
    Previous,
    Next,
    SeekBackward,
    SeekForward,
}

pub fn action_for(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::VolumeUp),
        KeyCode::Char('-') => Some(Action::VolumeDown),
        KeyCode::Char('p') => Some(Action::TogglePlay),
        KeyCode::Char(',') | KeyCode::Char('<') | KeyCode::Left => Some(Action::Previous),
        KeyCode::Char('.') | KeyCode::Char('>') | KeyCode::Right => Some(Action::Next),
        KeyCode::Char('[') => Some(Action::SeekBackward),
        KeyCode::Char(']') => Some(Action::SeekForward),
        _ => None,
    }
}

/// Feedback text for the last key line.
pub fn describe_key(code: KeyCode) -> String {
    match code {
        KeyCode::Char(c) => format!("'{c}' ord={}", c as u32),
        other => format!("{other:?}"),
    }
}

pub struct App {
    dispatcher: CommandDispatcher,
    store: StateStore,
    host: String,
    volume_step: i32,
    seek_step: f64,
    last_key: Option<String>,
}

impl App {
    pub fn new(
        dispatcher: CommandDispatcher,
        store: StateStore,
        host: String,
        volume_step: u32,
        seek_step: u32,
    ) -> Self {
        Self {
            dispatcher,
            store,
            host,
            volume_step: i32::try_from(volume_step).unwrap_or(i32::MAX),
            seek_step: f64::from(seek_step),
            last_key: None,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn last_key(&self) -> Option<&str> {
        self.last_key.as_deref()
    }

    /// Applies a key press. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        self.last_key = Some(describe_key(key.code));

        let Some(action) = action_for(key.code) else {
            return false;
        };
        match action {
            Action::Quit => return true,
            Action::VolumeUp => {
                self.dispatcher.change_volume(self.volume_step);
            }
            Action::VolumeDown => {
                self.dispatcher.change_volume(-self.volume_step);
            }
            Action::TogglePlay => {
                self.dispatcher.toggle_play();
            }
            Action::Previous => self.dispatcher.previous(),
            Action::Next => self.dispatcher.next(),
            Action::SeekBackward => {
                self.dispatcher.seek_relative(-self.seek_step);
            }
            Action::SeekForward => {
                self.dispatcher.seek_relative(self.seek_step);
            }
        }
        false
    }
}
