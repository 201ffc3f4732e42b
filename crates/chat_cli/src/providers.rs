use std::sync::Arc;
use std::time::Duration;

use chat_provider::ChatProvider;
use chat_provider_mock::{MockProvider, MOCK_PROVIDER_ID};
use chat_provider_openai::{OpenAiProvider, OpenAiProviderConfig, OPENAI_PROVIDER_ID};

use crate::config::AppConfig;

/// Builds the provider named by `config.provider`.
pub fn provider_for_config(config: &AppConfig) -> Result<Arc<dyn ChatProvider>, String> {
    provider_for_id(&config.provider, config, |key| std::env::var(key).ok())
}

pub fn provider_for_id(
    provider_id: &str,
    config: &AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn ChatProvider>, String> {
    match provider_id {
        MOCK_PROVIDER_ID => Ok(Arc::new(
            MockProvider::default().with_model(config.model.clone()),
        )),
        OPENAI_PROVIDER_ID => {
            let provider_config = OpenAiProviderConfig::from_lookup(config.model.clone(), lookup)
                .map_err(|error| error.to_string())?
                .with_timeout(Duration::from_secs(config.request_timeout_sec));
            let provider = OpenAiProvider::new(provider_config).map_err(|error| error.to_string())?;
            Ok(Arc::new(provider))
        }
        unknown => Err(format!(
            "Unsupported provider '{unknown}'. Available providers: {MOCK_PROVIDER_ID}, {OPENAI_PROVIDER_ID}"
        )),
    }
}
