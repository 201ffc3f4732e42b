use chat_provider::Message;
use reqwest::{Client, Response, StatusCode};

use crate::config::OpenAiConfig;
use crate::error::{parse_error_message, OpenAiError};
use crate::payload::{ChatCompletionRequest, ChatCompletionResponse};
use crate::retry::{is_quota_error, is_retryable_http_error, retry_delay};
use crate::url::normalize_chat_completions_url;

#[derive(Debug)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        if config.api_key.trim().is_empty() {
            return Err(OpenAiError::MissingApiKey);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OpenAiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        normalize_chat_completions_url(&self.config.base_url)
    }

    pub fn request_payload(&self, messages: &[Message]) -> ChatCompletionRequest {
        let mut payload = ChatCompletionRequest::new(self.config.model.clone(), messages);
        payload.temperature = self.config.temperature;
        payload
    }

    pub fn build_request(&self, messages: &[Message]) -> reqwest::RequestBuilder {
        self.http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_payload(messages))
    }

    /// Sends the request, retrying transient failures with exponential backoff.
    pub async fn send_with_retry(&self, messages: &[Message]) -> Result<Response, OpenAiError> {
        let max_retries = self.config.max_retries;
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match self.build_request(messages).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    last_status = Some(status);
                    let body = response.text().await.unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < max_retries && is_retryable_http_error(status.as_u16(), &body) {
                        tracing::debug!(attempt, %status, "retrying chat completion request");
                        tokio::time::sleep(retry_delay(attempt)).await;
                        continue;
                    }

                    return Err(OpenAiError::Status(status, message));
                }
                Err(error) => {
                    let message = error.to_string();
                    last_error = Some(message.clone());
                    if attempt < max_retries && !error.is_builder() && !is_quota_error(&message) {
                        tracing::debug!(attempt, %message, "retrying chat completion request");
                        tokio::time::sleep(retry_delay(attempt)).await;
                        continue;
                    }
                    return Err(OpenAiError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(OpenAiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Runs one completion and returns the first choice as an assistant message.
    pub async fn complete(&self, messages: &[Message]) -> Result<Message, OpenAiError> {
        let response = self.send_with_retry(messages).await?;
        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)?;
        parsed.into_first_message().ok_or(OpenAiError::EmptyResponse)
    }
}
