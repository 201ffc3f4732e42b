use std::path::PathBuf;

use chat_provider::ProviderError;
use history_store::HistoryStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("conversation '{id}' not found")]
    NotFound { id: String },

    #[error("model call failed: {0}")]
    Upstream(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("corrupt conversation data: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(HistoryStoreError),

    #[error("a turn is already in progress for conversation '{id}'")]
    TurnInProgress { id: String },

    #[error("no active conversation; start a new one or switch to an existing one")]
    NoActiveConversation,

    #[error("unknown instruction '{name}'")]
    UnknownInstruction { name: String },

    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ChatError {
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// True for failures of the model-call collaborator (including timeouts).
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Auth(_))
    }
}

impl From<ProviderError> for ChatError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Upstream(message) => Self::Upstream(message),
            ProviderError::Auth(message) => Self::Auth(message),
        }
    }
}

impl From<HistoryStoreError> for ChatError {
    fn from(error: HistoryStoreError) -> Self {
        match error {
            HistoryStoreError::NotFound { id, .. } => Self::NotFound { id },
            HistoryStoreError::Parse { path, source } => {
                Self::Serialization(format!("{}: {source}", path.display()))
            }
            other => Self::Store(other),
        }
    }
}
