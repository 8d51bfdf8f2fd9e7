//! Application-level configuration loading, including broadcast and
//! workflow tunables.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CONTEST_LIVE_BACK_CONFIG_PATH";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interval between heartbeat pings on viewer connections.
    pub heartbeat_interval: Duration,
    /// First delay of the client reconnect backoff.
    pub reconnect_base: Duration,
    /// Ceiling of the client reconnect backoff.
    pub reconnect_cap: Duration,
    /// Largest single extension an admin may apply, in minutes.
    pub max_extension_minutes: u64,
    /// Whether resuming shifts the end time by the paused duration.
    pub pause_compensation: bool,
    /// Minimum character count for a retry-request reason.
    pub retry_reason_min_len: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            reconnect_base: Duration::from_secs(1),
            reconnect_cap: Duration::from_secs(30),
            max_extension_minutes: 120,
            pause_compensation: true,
            retry_reason_min_len: 10,
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    heartbeat_interval_secs: Option<u64>,
    reconnect_base_ms: Option<u64>,
    reconnect_cap_ms: Option<u64>,
    max_extension_minutes: Option<u64>,
    pause_compensation: Option<bool>,
    retry_reason_min_len: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            heartbeat_interval: raw
                .heartbeat_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            reconnect_base: raw
                .reconnect_base_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_base),
            reconnect_cap: raw
                .reconnect_cap_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_cap),
            max_extension_minutes: raw
                .max_extension_minutes
                .unwrap_or(defaults.max_extension_minutes),
            pause_compensation: raw
                .pause_compensation
                .unwrap_or(defaults.pause_compensation),
            retry_reason_min_len: raw
                .retry_reason_min_len
                .unwrap_or(defaults.retry_reason_min_len),
        }
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
