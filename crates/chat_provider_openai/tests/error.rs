use reqwest::StatusCode;

use chat_provider_openai::error::parse_error_message;
use chat_provider_openai::OpenAiError;

#[test]
fn parse_error_message_uses_message_and_code() {
    let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
    let message = parse_error_message(StatusCode::UNAUTHORIZED, body);
    assert_eq!(message, "Incorrect API key provided (invalid_api_key)");
}

#[test]
fn parse_error_message_falls_back_to_type() {
    let body = r#"{"error":{"message":"model overloaded","type":"server_error"}}"#;
    let message = parse_error_message(StatusCode::SERVICE_UNAVAILABLE, body);
    assert_eq!(message, "model overloaded (server_error)");
}

#[test]
fn parse_error_message_falls_back_to_raw_body() {
    let message = parse_error_message(StatusCode::BAD_GATEWAY, "raw failure text");
    assert_eq!(message, "raw failure text");
}

#[test]
fn parse_error_message_uses_reason_for_empty_body() {
    let message = parse_error_message(StatusCode::BAD_GATEWAY, "");
    assert_eq!(message, "Bad Gateway");
}

#[test]
fn auth_classification() {
    assert!(OpenAiError::MissingApiKey.is_auth());
    assert!(OpenAiError::Status(StatusCode::FORBIDDEN, String::new()).is_auth());
    assert!(!OpenAiError::Status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_auth());
    assert!(!OpenAiError::EmptyResponse.is_auth());
}
