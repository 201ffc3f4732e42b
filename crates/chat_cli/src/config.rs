//! Application configuration file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_provider_mock::MOCK_PROVIDER_ID;
use chat_provider_openai::DEFAULT_OPENAI_MODEL;
use serde::{Deserialize, Serialize};
use termchat::{SessionConfig, DEFAULT_INSTRUCTION_NAME};
use thiserror::Error;

pub const CONFIG_PATH_ENV_VAR: &str = "TERMCHAT_CONFIG_PATH";
pub const PROVIDER_ENV_VAR: &str = "TERMCHAT_PROVIDER";
pub const DEFAULT_CONFIG_FILE: &str = "termchat.json";
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while {operation} config at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory of `<name>.txt` instruction files.
    pub instructions: PathBuf,
    /// Directory of saved conversations.
    pub history: PathBuf,
    /// Directory for replies saved with `/save`.
    pub saved: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            instructions: PathBuf::from("bots"),
            history: PathBuf::from("history"),
            saved: PathBuf::from("saved"),
        }
    }
}

impl PathsConfig {
    /// Resolves relative entries against `base_dir`.
    #[must_use]
    pub fn resolve(&self, base_dir: &Path) -> Self {
        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            }
        };

        Self {
            instructions: resolve(&self.instructions),
            history: resolve(&self.history),
            saved: resolve(&self.saved),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub provider: String,
    pub model: String,
    pub instruction: String,
    pub history_size: Option<usize>,
    pub auto_save: bool,
    pub save_history_on_exit: bool,
    pub save_config_on_exit: bool,
    pub keep_new_conversation: bool,
    pub request_timeout_sec: u64,
    pub paths: PathsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: MOCK_PROVIDER_ID.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            instruction: DEFAULT_INSTRUCTION_NAME.to_string(),
            history_size: None,
            auto_save: true,
            save_history_on_exit: true,
            save_config_on_exit: false,
            keep_new_conversation: true,
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
            paths: PathsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found; using defaults");
                return Ok(Self::default());
            }
            Err(error) => return Err(ConfigError::io("reading", path, error)),
        };

        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| ConfigError::io("creating directory for", parent, error))?;
        }

        let mut text = self.to_pretty_json()?;
        text.push('\n');
        fs::write(path, text).map_err(|error| ConfigError::io("writing", path, error))?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }

    pub fn to_pretty_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_sec == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_sec must be greater than 0".to_string(),
            ));
        }
        if self.provider.trim().is_empty() {
            return Err(ConfigError::Invalid("provider must not be empty".to_string()));
        }
        Ok(())
    }

    /// Applies `TERMCHAT_PROVIDER` read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup(PROVIDER_ENV_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            self.provider = provider;
        }
    }

    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_instruction(self.instruction.clone())
            .with_history_size(self.history_size)
            .with_auto_save(self.auto_save)
            .with_keep_new_conversation(self.keep_new_conversation)
            .with_request_timeout(Duration::from_secs(self.request_timeout_sec))
    }
}

/// Config file location: `TERMCHAT_CONFIG_PATH`, else `./termchat.json`.
#[must_use]
pub fn config_path_from_env() -> PathBuf {
    env_string_opt(CONFIG_PATH_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Directory that relative config paths are resolved against.
#[must_use]
pub fn config_base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub(crate) fn env_string_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
