mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiCompatibleClient;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("llm request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("llm api returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to decode llm response: {0}")]
    Deserialization(#[source] reqwest::Error),
}

impl ProviderError {
    /// Timeouts, connection failures, rate limits and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(error) => error.is_timeout() || error.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::ClientBuild(_) | Self::Deserialization(_) => false,
        }
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api { status: status.as_u16(), body })
}
