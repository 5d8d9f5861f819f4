// ============================
// livepoll-backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix for environment overrides, e.g. `LIVEPOLL_SESSION__CHAT_CAPACITY=500`
pub const ENV_PREFIX: &str = "LIVEPOLL_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Limits applied by the poll session
    pub session: SessionSettings,
}

/// Capacities and payload limits of the poll session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Countdown used when the presenter does not send one
    pub default_time_limit_secs: u32,
    /// Longest countdown a presenter may request, unbounded when unset
    #[serde(default)]
    pub max_time_limit_secs: Option<u32>,
    /// Closed polls kept in history
    pub history_capacity: usize,
    /// Chat messages kept in the log
    pub chat_capacity: usize,
    pub max_question_len: usize,
    pub max_option_len: usize,
    /// Most options per poll, unbounded when unset
    #[serde(default)]
    pub max_options: Option<usize>,
    pub max_display_name_len: usize,
    pub max_chat_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            log_level: "info".to_string(),
            log_json: false,
            session: SessionSettings::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_time_limit_secs: 60,
            max_time_limit_secs: None,
            history_capacity: 50,
            chat_capacity: 200,
            max_question_len: 100,
            max_option_len: 100,
            max_options: None,
            max_display_name_len: 50,
            max_chat_len: 500,
        }
    }
}

impl Settings {
    /// Load settings from the default config file and the environment
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load settings: built-in defaults, then `path` if it exists, then
    /// `LIVEPOLL_*` environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AppError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "log_level must be one of {LOG_LEVELS:?}, got {:?}",
                self.log_level
            )));
        }
        self.session.validate()
    }
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        let positive = [
            ("history_capacity", self.history_capacity),
            ("chat_capacity", self.chat_capacity),
            ("max_question_len", self.max_question_len),
            ("max_option_len", self.max_option_len),
            ("max_display_name_len", self.max_display_name_len),
            ("max_chat_len", self.max_chat_len),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::Config(format!("{name} must be greater than zero")));
        }

        // A poll needs at least two options
        if self.max_options.is_some_and(|max| max < 2) {
            return Err(AppError::Config("max_options must be at least 2".to_string()));
        }

        if self.max_time_limit_secs == Some(0) {
            return Err(AppError::Config("max_time_limit_secs must be greater than zero".to_string()));
        }
        if self.default_time_limit_secs == 0 {
            return Err(AppError::Config("default_time_limit_secs must be greater than zero".to_string()));
        }
        if let Some(max) = self.max_time_limit_secs {
            if self.default_time_limit_secs > max {
                return Err(AppError::Config(format!(
                    "default_time_limit_secs must not exceed max_time_limit_secs ({max})"
                )));
            }
        }

        Ok(())
    }
}
