//! Minimal provider-agnostic contract for one chat completion call.
//!
//! This crate defines only the message model shared by the conversation engine
//! and its model-call collaborators. Transport details, credentials and retry
//! policy belong to the provider implementations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned while constructing/configuring a provider before any call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failure of a single completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The remote service failed, timed out or returned an unusable reply.
    Upstream(String),
    /// Credentials are missing or were rejected.
    Auth(String),
}

impl ProviderError {
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Returns the underlying error message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Upstream(message) | Self::Auth(message) => message,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream(message) => write!(f, "upstream error: {message}"),
            Self::Auth(message) => write!(f, "authentication error: {message}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-neutral chat message. Serialized as `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Immutable metadata describing a chat provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Model-call collaborator: ordered messages in, one assistant message out.
pub trait ChatProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Executes one completion over the full compiled message sequence.
    ///
    /// Implementations block until the reply is available. Callers that need a
    /// deadline run this on a worker thread.
    fn complete(&self, messages: &[Message]) -> Result<Message, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::{ChatProvider, Message, ProviderError, ProviderInitError, ProviderProfile, Role};

    struct EchoProvider;

    impl ChatProvider for EchoProvider {
        fn profile(&self) -> ProviderProfile {
            ProviderProfile {
                provider_id: "echo".to_string(),
                model_id: "echo-model".to_string(),
            }
        }

        fn complete(&self, messages: &[Message]) -> Result<Message, ProviderError> {
            let last = messages
                .last()
                .ok_or_else(|| ProviderError::upstream("no messages"))?;
            Ok(Message::assistant(last.content.clone()))
        }
    }

    #[test]
    fn message_serializes_with_lowercase_role() {
        let message = Message::assistant("hello");
        let encoded = serde_json::to_string(&message).expect("message should serialize");
        assert_eq!(encoded, r#"{"role":"assistant","content":"hello"}"#);

        let decoded: Message =
            serde_json::from_str(r#"{"role":"system","content":"be brief"}"#)
                .expect("message should deserialize");
        assert_eq!(decoded, Message::system("be brief"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = serde_json::from_str::<Message>(r#"{"role":"tool","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn provider_error_display_distinguishes_kinds() {
        assert_eq!(
            ProviderError::upstream("timed out").to_string(),
            "upstream error: timed out"
        );
        assert_eq!(
            ProviderError::auth("missing key").to_string(),
            "authentication error: missing key"
        );
        assert_eq!(ProviderError::auth("missing key").message(), "missing key");
    }

    #[test]
    fn provider_init_error_preserves_message() {
        let error = ProviderInitError::new("missing token");
        assert_eq!(error.message(), "missing token");
        assert_eq!(error.to_string(), "missing token");
    }

    #[test]
    fn role_display_matches_wire_names() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn provider_completes_with_assistant_message() {
        let provider = EchoProvider;
        let reply = provider
            .complete(&[Message::system("sys"), Message::user("ping")])
            .expect("echo should succeed");

        assert_eq!(reply, Message::assistant("ping"));
        assert_eq!(provider.profile().provider_id, "echo");
    }

    #[test]
    fn provider_reports_upstream_error_for_empty_input() {
        let error = EchoProvider
            .complete(&[])
            .expect_err("empty input should fail");
        assert_eq!(error, ProviderError::Upstream("no messages".to_string()));
    }
}
