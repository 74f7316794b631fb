//! # Volumito Configuration Module
//!
//! This module provides configuration management for Volumito, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Typed getters with defaults
//!
//! ## Usage
//!
//! ```no_run
//! use volconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let host = config.get_volumio_host()?;
//! let every = config.get_poll_interval();
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Context, Result};
use serde_yaml::{Mapping, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("volumito.yaml");

const ENV_CONFIG_DIR: &str = "VOLUMITO_CONFIG";
const ENV_PREFIX: &str = "VOLUMITO_CONFIG__";
const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 3000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_RENDER_INTERVAL_MS: u64 = 250;
const DEFAULT_VOLUME_STEP: u64 = 2;
const DEFAULT_SEEK_STEP: u64 = 30;
const DEFAULT_LOG_MIN_LEVEL: &str = "info";

/// Getter for a millisecond duration, with default
macro_rules! impl_millis_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Duration {
            Duration::from_millis(self.get_u64($path).unwrap_or($default))
        }
    };
}

/// Getter for a small integer step, with default
macro_rules! impl_step_config {
    ($getter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> u32 {
            self.get_u64($path)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or($default as u32)
        }
    };
}

/// Volumito configuration, read once at startup.
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    created: bool,
    data: Value,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        // 1. Try provided directory
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        // 3. Try the user configuration directory
        if let Some(dir) = dirs::config_dir() {
            return dir.join("volumito");
        }

        PathBuf::from(".volumito")
    }

    fn prepare_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Cannot create config directory {}", path.display()))?;
        }
        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }
        Ok(())
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory (`directory`, then
    ///    `VOLUMITO_CONFIG`, then the user config dir)
    /// 2. Writes the embedded default as config.yaml if there is none
    /// 3. Merges config.yaml over the embedded default
    /// 4. Applies `VOLUMITO_CONFIG__A__B` environment overrides
    /// 5. Checks that `volumio_host` is set
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::prepare_config_dir(&config_dir)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join(CONFIG_FILE);
        let created = !path.exists();
        let user_yaml = if created {
            fs::write(&path, DEFAULT_CONFIG)
                .with_context(|| format!("Cannot write default config {}", path.display()))?;
            info!(config_file = %path.display(), "Created default config file");
            DEFAULT_CONFIG.to_string()
        } else {
            info!(config_file = %path.display(), "Loaded config file");
            fs::read_to_string(&path).with_context(|| format!("Cannot read {}", path.display()))?
        };

        let user: Value = serde_yaml::from_str(&user_yaml)
            .with_context(|| format!("Error parsing config {}", path.display()))?;
        let mut data = lowercase_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);
        merge_yaml(&mut data, &lowercase_keys(user));
        apply_overrides(&mut data, env::vars());

        let config = Config {
            config_dir,
            path,
            created,
            data,
        };

        config
            .get_volumio_host()
            .with_context(|| format!("Invalid config file {}", config.path.display()))?;

        Ok(config)
    }

    /// True when `load_config` had to write a default config.yaml.
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value at `path`; keys are matched case-insensitively.
    pub fn get_value(&self, path: &[&str]) -> Option<&Value> {
        lookup(&self.data, path)
    }

    /// Reads a non-negative integer, accepting numeric strings.
    fn get_u64(&self, path: &[&str]) -> Option<u64> {
        match self.get_value(path)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Host of the Volumio device. Fails when missing or empty.
    pub fn get_volumio_host(&self) -> Result<String> {
        match self.get_value(&["volumio_host"]) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(_) => Err(anyhow!("volumio_host must be a non-empty string")),
            None => Err(anyhow!("volumio_host is missing")),
        }
    }

    impl_millis_config!(
        get_http_timeout,
        &["http", "timeout_ms"],
        DEFAULT_HTTP_TIMEOUT_MS
    );

    impl_millis_config!(
        get_poll_interval,
        &["polling", "interval_ms"],
        DEFAULT_POLL_INTERVAL_MS
    );

    impl_millis_config!(
        get_render_interval,
        &["ui", "refresh_ms"],
        DEFAULT_RENDER_INTERVAL_MS
    );

    impl_step_config!(
        get_volume_step,
        &["controls", "volume_step"],
        DEFAULT_VOLUME_STEP
    );

    impl_step_config!(
        get_seek_step,
        &["controls", "seek_step"],
        DEFAULT_SEEK_STEP
    );

    /// Minimum log level, as an `EnvFilter` directive.
    pub fn get_log_min_level(&self) -> String {
        match self.get_value(&["logger", "min_level"]) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => DEFAULT_LOG_MIN_LEVEL.to_string(),
        }
    }

    /// Log file, resolved against the config directory when relative.
    pub fn get_log_file(&self) -> Option<PathBuf> {
        match self.get_value(&["logger", "file"]) {
            Some(Value::String(s)) if !s.is_empty() => {
                let path = PathBuf::from(s);
                Some(if path.is_absolute() {
                    path
                } else {
                    self.config_dir.join(path)
                })
            }
            _ => None,
        }
    }
}

fn lookup<'a>(data: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(data, |node, key| {
        node.as_mapping()?
            .get(Value::String(key.to_lowercase()))
    })
}

/// Writes `value` at `path`, creating intermediate mappings. A scalar in the
/// way is replaced by a mapping.
fn insert_at(data: &mut Value, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return;
    };
    if !data.is_mapping() {
        *data = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = data {
        let child = map
            .entry(Value::String(first.clone()))
            .or_insert(Value::Null);
        insert_at(child, rest, value);
    }
}

/// Applies every `VOLUMITO_CONFIG__A__B=value` pair as an override of
/// `a.b`. Values are read as YAML scalars, so `250` is a number.
fn apply_overrides(data: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, raw) in vars {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = rest
            .split("__")
            .filter(|part| !part.is_empty())
            .map(str::to_lowercase)
            .collect();
        if path.is_empty() {
            continue;
        }
        let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw));
        info!(key = %key, "Applying environment override");
        insert_at(data, &path, value);
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Merges `user` into `default`: mappings key by key, anything else replaces.
fn merge_yaml(default: &mut Value, user: &Value) {
    match (default, user) {
        (Value::Mapping(base), Value::Mapping(over)) => {
            for (k, v) in over {
                match base.get_mut(k) {
                    Some(slot) => merge_yaml(slot, v),
                    None => {
                        base.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (slot, v) => *slot = v.clone(),
    }
}
