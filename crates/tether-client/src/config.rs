//! Client configuration resolution.
//!
//! Priority for each setting:
//! 1. Explicit values set by the caller (CLI flags)
//! 2. Environment: `TETHER_URL`, `TETHER_TIMEOUT`, `TETHER_SESSION`
//! 3. The config file: `TETHER_CONFIG`, else `~/.tether/config.json`
//! 4. Built-in defaults
//!
//! Empty environment values are ignored. A missing config file is not an
//! error; an unreadable or malformed one is.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tether_core::json::{Map, Value};
use thiserror::Error;

use crate::wait::Timeout;

pub const DEFAULT_URL: &str = "http://localhost:4444/";
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Connection pool settings for the HTTP transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_idle_per_host: usize,
    /// Limit on a single HTTP exchange. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
            request_timeout: None,
        }
    }
}

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub url: String,
    /// Default timeout for waits such as [`Session::window`](crate::Session::window).
    pub timeout: Timeout,
    pub desired_capabilities: Map,
    pub pool: PoolConfig,
    /// A server session to attach to instead of opening one.
    pub session: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: Timeout::DEFAULT,
            desired_capabilities: Map::new(),
            pool: PoolConfig::default(),
            session: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    url: Option<String>,
    timeout: Option<TimeoutSetting>,
    desired_capabilities: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pool: PoolFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolFile {
    max_idle_per_host: Option<usize>,
    request_timeout: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeoutSetting {
    Seconds(f64),
    Text(String),
}

/// Read an environment variable, treating empty as unset.
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get the config file path.
///
/// Priority:
/// 1. `TETHER_CONFIG` (ignores empty string)
/// 2. `~/.tether/config.json`
pub fn get_config_path() -> Option<PathBuf> {
    if let Some(path) = env_value("TETHER_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".tether").join("config.json"))
}

/// Session id from `TETHER_SESSION`, if set.
pub fn get_session() -> Option<String> {
    env_value("TETHER_SESSION")
}

fn parse_timeout(name: &'static str, text: &str) -> Result<Timeout, ConfigError> {
    text.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: text.to_string(),
    })
}

impl ClientConfig {
    /// Resolve from the environment and the config file.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match get_config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(url) = env_value("TETHER_URL") {
            config.url = url;
        }
        if let Some(timeout) = env_value("TETHER_TIMEOUT") {
            config.timeout = parse_timeout("TETHER_TIMEOUT", &timeout)?;
        }
        if let Some(session) = get_session() {
            config.session = Some(session);
        }
        Ok(config)
    }

    /// Defaults overlaid with the file at `path`, if it exists.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let file: ConfigFile =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!("Loaded config from {}", path.display());
        Self::default().overlay(file)
    }

    fn overlay(mut self, file: ConfigFile) -> Result<Self, ConfigError> {
        if let Some(url) = file.url.filter(|u| !u.is_empty()) {
            self.url = url;
        }
        match file.timeout {
            Some(TimeoutSetting::Seconds(seconds)) => {
                self.timeout =
                    Timeout::from_secs_f64(seconds).map_err(|_| ConfigError::InvalidValue {
                        name: "timeout",
                        value: seconds.to_string(),
                    })?;
            }
            Some(TimeoutSetting::Text(text)) => self.timeout = parse_timeout("timeout", &text)?,
            None => {}
        }
        if let Some(caps) = file.desired_capabilities {
            self.desired_capabilities = caps
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect();
        }
        if let Some(max_idle) = file.pool.max_idle_per_host {
            self.pool.max_idle_per_host = max_idle;
        }
        if let Some(seconds) = file.pool.request_timeout {
            let limit =
                Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidValue {
                    name: "pool.requestTimeout",
                    value: seconds.to_string(),
                })?;
            self.pool.request_timeout = Some(limit);
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use super::*;

    /// The variables [`ClientConfig::load`] reads.
    const TETHER_VARS: [&str; 4] = [
        "TETHER_URL",
        "TETHER_TIMEOUT",
        "TETHER_SESSION",
        "TETHER_CONFIG",
    ];

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Exclusive access to the `TETHER_*` variables, cleared on entry and
    /// restored on drop.
    struct TetherEnv {
        saved: Vec<(&'static str, Option<String>)>,
        _lock: MutexGuard<'static, ()>,
    }

    impl TetherEnv {
        fn clean() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            let saved = TETHER_VARS
                .iter()
                .map(|&name| (name, std::env::var(name).ok()))
                .collect();
            // SAFETY: ENV_LOCK is held until the guard drops.
            unsafe {
                for name in TETHER_VARS {
                    std::env::remove_var(name);
                }
            }
            Self { saved, _lock: lock }
        }

        fn set(&self, name: &str, value: impl AsRef<std::ffi::OsStr>) {
            assert!(TETHER_VARS.contains(&name), "{} is not read by config", name);
            // SAFETY: ENV_LOCK is held by self.
            unsafe { std::env::set_var(name, value) }
        }
    }

    impl Drop for TetherEnv {
        fn drop(&mut self) {
            // SAFETY: ENV_LOCK is still held.
            unsafe {
                for (name, value) in &self.saved {
                    match value {
                        Some(v) => std::env::set_var(name, v),
                        None => std::env::remove_var(name),
                    }
                }
            }
        }
    }

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tether-config-{}-{}.json",
            name,
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_clean_env_hides_outer_values() {
        let env = TetherEnv::clean();
        assert!(TETHER_VARS.iter().all(|name| std::env::var(name).is_err()));
        env.set("TETHER_SESSION", "inner");
        assert_eq!(get_session().as_deref(), Some("inner"));
    }

    #[test]
    fn test_defaults_without_file() {
        let env = TetherEnv::clean();
        env.set("TETHER_CONFIG", std::env::temp_dir().join("tether-no-such-config.json"));

        let config = ClientConfig::load().unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.timeout, Timeout::DEFAULT);
        assert_eq!(config.pool.max_idle_per_host, 50);
        assert!(config.session.is_none());
    }

    #[test]
    fn test_file_values() {
        let env = TetherEnv::clean();
        let path = temp_config(
            "file",
            r#"{"url":"http://rc:4444/","timeout":"inf","desiredCapabilities":{"applicationName":"notepad"},
                "pool":{"maxIdlePerHost":4,"requestTimeout":2.5}}"#,
        );
        env.set("TETHER_CONFIG", &path);

        let config = ClientConfig::load().unwrap();
        assert_eq!(config.url, "http://rc:4444/");
        assert_eq!(config.timeout, Timeout::INFINITE);
        assert_eq!(
            config.desired_capabilities.get("applicationName"),
            Some(&Value::from("notepad"))
        );
        assert_eq!(config.pool.max_idle_per_host, 4);
        assert_eq!(config.pool.request_timeout, Some(Duration::from_millis(2500)));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_env_overrides_file() {
        let env = TetherEnv::clean();
        let path = temp_config("env", r#"{"url":"http://file:1/","timeout":5}"#);
        env.set("TETHER_CONFIG", &path);
        env.set("TETHER_URL", "http://env:2/");
        env.set("TETHER_TIMEOUT", "");
        env.set("TETHER_SESSION", "abc");

        let config = ClientConfig::load().unwrap();
        assert_eq!(config.url, "http://env:2/");
        assert_eq!(config.timeout, Timeout::from_duration(Duration::from_secs(5)));
        assert_eq!(config.session.as_deref(), Some("abc"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_config("bad", "{not json");
        let err = ClientConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_bad_env_timeout() {
        let env = TetherEnv::clean();
        env.set("TETHER_CONFIG", std::env::temp_dir().join("tether-no-such-config.json"));
        env.set("TETHER_TIMEOUT", "later");

        let err = ClientConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "TETHER_TIMEOUT", .. }));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::default()
            .with_url("http://x/")
            .with_session("s")
            .with_timeout(Timeout::ZERO);
        assert_eq!(config.url, "http://x/");
        assert_eq!(config.session.as_deref(), Some("s"));
        assert_eq!(config.timeout, Timeout::ZERO);
    }
}
