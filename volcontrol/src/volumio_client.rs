use std::fmt;
use std::time::Duration;

use tracing::trace;
use ureq::Agent;

use crate::errors::ControlError;
use crate::raw::RawSnapshot;

const STATE_PATH: &str = "/api/v1/getState";
const COMMAND_PATH: &str = "/api/v1/commands/";

/// Parameter spelling used for a seek request.
///
/// Players disagree on which one they honor; the others are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekParam {
    Value,
    Position,
    Seek,
}

impl SeekParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeekParam::Value => "value",
            SeekParam::Position => "position",
            SeekParam::Seek => "seek",
        }
    }
}

/// A fire-and-forget player command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Previous,
    Next,
    /// Absolute volume in `[0, 100]`.
    Volume(u8),
    /// Seek to `value`, whose unit depends on what the receiving spelling
    /// expects.
    Seek { param: SeekParam, value: u64 },
}

impl PlayerCommand {
    /// Query string for the command endpoint.
    pub fn query(&self) -> String {
        match self {
            PlayerCommand::Play => "cmd=play".to_string(),
            PlayerCommand::Pause => "cmd=pause".to_string(),
            PlayerCommand::Previous => "cmd=prev".to_string(),
            PlayerCommand::Next => "cmd=next".to_string(),
            PlayerCommand::Volume(v) => format!("cmd=volume&volume={}", (*v).min(100)),
            PlayerCommand::Seek { param, value } => {
                format!("cmd=seek&{}={}", param.as_str(), value)
            }
        }
    }
}

/// Remote player as seen by the poller and the dispatcher.
pub trait PlayerApi: Send + Sync {
    /// Fetches the current player state.
    ///
    /// Fails on transport errors, non-success statuses, unreadable bodies
    /// and payloads that are not a JSON object.
    fn fetch_state(&self) -> Result<RawSnapshot, ControlError>;

    /// Sends one command. Success only means the request was delivered.
    fn send_command(&self, command: &PlayerCommand) -> Result<(), ControlError>;
}

/// Client for the Volumio REST API.
#[derive(Clone)]
pub struct VolumioClient {
    base_url: String,
    agent: Agent,
}

impl fmt::Debug for VolumioClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolumioClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl VolumioClient {
    /// `host` is a bare host (`volumio.local`, `10.0.0.5:3000`) or a full
    /// `http(s)://` base URL.
    pub fn new(host: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url(host),
            agent: build_agent(timeout),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state_url(&self) -> String {
        format!("{}{}", self.base_url, STATE_PATH)
    }

    pub fn command_url(&self, command: &PlayerCommand) -> String {
        format!("{}{}?{}", self.base_url, COMMAND_PATH, command.query())
    }

    fn get(&self, url: &str) -> Result<String, ControlError> {
        let mut response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::StatusCode(code) => ControlError::HttpStatus(url.to_string(), code),
            other => ControlError::http(url, other),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::HttpStatus(url.to_string(), status.as_u16()));
        }

        response
            .body_mut()
            .read_to_string()
            .map_err(|e| ControlError::body(url, e))
    }
}

impl PlayerApi for VolumioClient {
    fn fetch_state(&self) -> Result<RawSnapshot, ControlError> {
        let body = self.get(&self.state_url())?;
        parse_state(&body)
    }

    fn send_command(&self, command: &PlayerCommand) -> Result<(), ControlError> {
        let url = self.command_url(command);
        trace!(url = %url, "Sending player command");
        self.get(&url).map(|_| ())
    }
}

/// Parses a `getState` body; anything but a JSON object is rejected.
pub fn parse_state(body: &str) -> Result<RawSnapshot, ControlError> {
    let raw = RawSnapshot::from_json_str(body)?;
    if raw.is_mapping() {
        Ok(raw)
    } else {
        Err(ControlError::NotAMapping)
    }
}

pub fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

fn base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
