//! Application-level configuration loading: countdown pacing and poll defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "POLLROOM_BACK_CONFIG_PATH";
/// Period between two countdown ticks.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Delay between the last answer and the end of the poll.
const DEFAULT_COMPLETION_DEBOUNCE: Duration = Duration::from_millis(500);
/// Time limit applied when a poll is created without one.
const DEFAULT_TIME_LIMIT_SECONDS: u32 = 60;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    tick_interval: Duration,
    completion_debounce: Duration,
    default_time_limit_seconds: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        config = ?app_config,
                        "loaded configuration"
                    );
                    app_config
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

    /// Period between two countdown ticks. Each tick removes one second.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Delay between the last expected answer and the end of the poll.
    pub fn completion_debounce(&self) -> Duration {
        self.completion_debounce
    }

    /// Time limit used when `create_poll` omits one.
    pub fn default_time_limit_seconds(&self) -> u32 {
        self.default_time_limit_seconds
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            completion_debounce: DEFAULT_COMPLETION_DEBOUNCE,
            default_time_limit_seconds: DEFAULT_TIME_LIMIT_SECONDS,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    tick_interval_ms: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    completion_debounce_ms: Option<Duration>,
    #[serde(default)]
    default_time_limit_seconds: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        // A zero period would make the countdown interval panic.
        let tick_interval = value
            .tick_interval_ms
            .filter(|interval| !interval.is_zero())
            .unwrap_or(DEFAULT_TICK_INTERVAL);

        Self {
            tick_interval,
            completion_debounce: value
                .completion_debounce_ms
                .unwrap_or(DEFAULT_COMPLETION_DEBOUNCE),
            default_time_limit_seconds: value
                .default_time_limit_seconds
                .filter(|seconds| *seconds > 0)
                .unwrap_or(DEFAULT_TIME_LIMIT_SECONDS),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AppConfig {
        serde_json::from_str::<RawConfig>(json).unwrap().into()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("{}");
        assert_eq!(config.tick_interval(), DEFAULT_TICK_INTERVAL);
        assert_eq!(config.completion_debounce(), DEFAULT_COMPLETION_DEBOUNCE);
        assert_eq!(config.default_time_limit_seconds(), 60);
    }

    #[test]
    fn durations_are_read_as_milliseconds() {
        let config = parse(
            r#"{"tick_interval_ms": 250, "completion_debounce_ms": 0, "default_time_limit_seconds": 90}"#,
        );
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.completion_debounce(), Duration::ZERO);
        assert_eq!(config.default_time_limit_seconds(), 90);
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let config = parse(r#"{"tick_interval_ms": 0, "default_time_limit_seconds": 0}"#);
        assert_eq!(config.tick_interval(), DEFAULT_TICK_INTERVAL);
        assert_eq!(config.default_time_limit_seconds(), DEFAULT_TIME_LIMIT_SECONDS);
    }
}
