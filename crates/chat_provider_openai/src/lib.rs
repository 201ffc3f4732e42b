//! OpenAI chat-completions implementation of the shared `chat_provider` contract.
//!
//! The transport is async (`reqwest`); [`OpenAiProvider`] drives it on a
//! current-thread tokio runtime so callers see a blocking `complete`.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod retry;
pub mod url;

use std::sync::Arc;
use std::time::Duration;

use chat_provider::{ChatProvider, Message, ProviderError, ProviderInitError, ProviderProfile};

pub use client::OpenAiClient;
pub use config::{OpenAiConfig, DEFAULT_OPENAI_MODEL};
pub use error::OpenAiError;
pub use payload::{ChatCompletionRequest, ChatCompletionResponse};
pub use url::{normalize_chat_completions_url, DEFAULT_OPENAI_BASE_URL};

/// Stable provider identifier used for explicit startup selection.
pub const OPENAI_PROVIDER_ID: &str = "openai";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";

/// Runtime configuration for the OpenAI provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl OpenAiProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: None,
        }
    }

    /// Reads the API key and optional base URL from the process environment.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ProviderInitError> {
        Self::from_lookup(model, |key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(
        model: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProviderInitError> {
        let api_key = lookup(OPENAI_API_KEY_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ProviderInitError::new(format!(
                    "authentication error: {OPENAI_API_KEY_ENV} is not set"
                ))
            })?;

        let mut config = Self::new(api_key, model);
        if let Some(base_url) = lookup(OPENAI_BASE_URL_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_openai_config(self) -> OpenAiConfig {
        let mut config = OpenAiConfig::new(self.api_key).with_model(self.model);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait CompletionClient: Send + Sync {
    fn complete(&self, messages: &[Message]) -> Result<Message, OpenAiError>;
}

#[derive(Debug)]
struct DefaultCompletionClient {
    client: OpenAiClient,
}

impl CompletionClient for DefaultCompletionClient {
    fn complete(&self, messages: &[Message]) -> Result<Message, OpenAiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                OpenAiError::Runtime(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.complete(messages))
    }
}

/// `ChatProvider` adapter backed by the chat completions endpoint.
pub struct OpenAiProvider {
    model: String,
    client: Arc<dyn CompletionClient>,
}

impl OpenAiProvider {
    /// Creates a provider using real HTTP transport.
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderInitError> {
        let model = config.model.clone();
        let client = OpenAiClient::new(config.into_openai_config()).map_err(map_init_error)?;

        Ok(Self {
            model,
            client: Arc::new(DefaultCompletionClient { client }),
        })
    }

    #[cfg(test)]
    fn with_client(model: impl Into<String>, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            model: model.into(),
            client,
        }
    }
}

impl ChatProvider for OpenAiProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: OPENAI_PROVIDER_ID.to_string(),
            model_id: self.model.clone(),
        }
    }

    fn complete(&self, messages: &[Message]) -> Result<Message, ProviderError> {
        tracing::debug!(model = %self.model, messages = messages.len(), "chat completion request");
        self.client.complete(messages).map_err(map_call_error)
    }
}

fn map_init_error(error: OpenAiError) -> ProviderInitError {
    if error.is_auth() {
        ProviderInitError::new(format!("authentication error: {error}"))
    } else {
        ProviderInitError::new(format!("failed to initialize OpenAI client: {error}"))
    }
}

fn map_call_error(error: OpenAiError) -> ProviderError {
    if error.is_auth() {
        ProviderError::auth(error.to_string())
    } else {
        ProviderError::upstream(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use reqwest::StatusCode;

    use super::*;

    struct FixedClient {
        reply: fn() -> Result<Message, OpenAiError>,
    }

    impl CompletionClient for FixedClient {
        fn complete(&self, _messages: &[Message]) -> Result<Message, OpenAiError> {
            (self.reply)()
        }
    }

    fn provider(reply: fn() -> Result<Message, OpenAiError>) -> OpenAiProvider {
        OpenAiProvider::with_client("gpt-test", Arc::new(FixedClient { reply }))
    }

    #[test]
    fn profile_reports_provider_and_model() {
        let profile = provider(|| Ok(Message::assistant("hi"))).profile();
        assert_eq!(profile.provider_id, OPENAI_PROVIDER_ID);
        assert_eq!(profile.model_id, "gpt-test");
    }

    #[test]
    fn successful_reply_is_returned() {
        let reply = provider(|| Ok(Message::assistant("hi")))
            .complete(&[Message::user("hello")])
            .expect("reply should pass through");
        assert_eq!(reply, Message::assistant("hi"));
    }

    #[test]
    fn rejected_credentials_map_to_auth_errors() {
        let error = provider(|| {
            Err(OpenAiError::Status(
                StatusCode::UNAUTHORIZED,
                "Incorrect API key provided".to_string(),
            ))
        })
        .complete(&[Message::user("hello")])
        .expect_err("401 must fail");

        assert!(matches!(error, ProviderError::Auth(message) if message.contains("Incorrect API key")));
    }

    #[test]
    fn service_failures_map_to_upstream_errors() {
        let error = provider(|| {
            Err(OpenAiError::Status(
                StatusCode::SERVICE_UNAVAILABLE,
                "overloaded".to_string(),
            ))
        })
        .complete(&[Message::user("hello")])
        .expect_err("503 must fail");
        assert!(matches!(error, ProviderError::Upstream(_)));

        let error = provider(|| Err(OpenAiError::EmptyResponse))
            .complete(&[])
            .expect_err("empty response must fail");
        assert!(matches!(error, ProviderError::Upstream(_)));
    }

    #[test]
    fn config_from_lookup_requires_api_key() {
        let env: HashMap<&str, &str> = HashMap::new();
        let error = OpenAiProviderConfig::from_lookup("gpt-test", |key| {
            env.get(key).map(|value| value.to_string())
        })
        .expect_err("missing key must fail");
        assert!(error.message().contains(OPENAI_API_KEY_ENV));
    }

    #[test]
    fn config_from_lookup_reads_key_and_base_url() {
        let env = HashMap::from([
            (OPENAI_API_KEY_ENV, " sk-test \n"),
            (OPENAI_BASE_URL_ENV, "http://localhost:8080/v1"),
        ]);
        let config = OpenAiProviderConfig::from_lookup("gpt-test", |key| {
            env.get(key).map(|value| value.to_string())
        })
        .expect("config should load");

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1"));
    }

    #[test]
    fn blank_api_key_fails_provider_construction() {
        let error = OpenAiProvider::new(OpenAiProviderConfig::new("  ", "gpt-test"))
            .err()
            .expect("blank key must fail");
        assert!(error.message().starts_with("authentication error"));
    }
}
