use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;

use danswer_core::config::{LlmConfig, LlmProvider};

use crate::llm::LlmClient;
use crate::providers::{AnthropicClient, OpenAiCompatibleClient, ProviderError};
use crate::retry::RetryPolicy;

/// Per-call adjustments to the configured LLM.
#[derive(Clone, Debug, Default)]
pub struct LlmOptions {
    pub api_key: Option<SecretString>,
    pub use_fast_llm: bool,
    pub model_version_override: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// An explicit override wins, then the fast model when asked for, then the
/// configured model.
pub fn resolve_model_version(config: &LlmConfig, options: &LlmOptions) -> String {
    match options.model_version_override.as_deref() {
        Some(version) if !version.trim().is_empty() => version.to_string(),
        _ if options.use_fast_llm => config.fast_model.clone(),
        _ => config.model.clone(),
    }
}

/// Builds the client for the configured provider.
pub fn get_default_llm(
    config: &LlmConfig,
    options: LlmOptions,
) -> Result<Arc<dyn LlmClient>, ProviderError> {
    let model = resolve_model_version(config, &options);
    let api_key = options.api_key.or_else(|| config.api_key.clone());
    let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(config.timeout_secs));
    let retry = RetryPolicy::with_max_retries(config.max_retries);
    let base_url = config.base_url.as_deref();

    debug!(
        event_name = "llm.client.built",
        provider = config.provider.as_str(),
        model = %model,
        timeout_secs = timeout.as_secs(),
        "building llm client"
    );

    Ok(match config.provider {
        LlmProvider::OpenAi | LlmProvider::Ollama => {
            Arc::new(OpenAiCompatibleClient::new(base_url, api_key, model, timeout, retry)?)
        }
        LlmProvider::Anthropic => {
            Arc::new(AnthropicClient::new(base_url, api_key, model, timeout, retry)?)
        }
    })
}
