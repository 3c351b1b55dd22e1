use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_for_status, ProviderError};
use crate::llm::LlmClient;
use crate::retry::RetryPolicy;

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Clone)]
pub struct AnthropicClient {
    client: ReqwestClient,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    retry: RetryPolicy,
}

impl AnthropicClient {
    pub fn new(
        base_url: Option<&str>,
        api_key: Option<SecretString>,
        model: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let client =
            ReqwestClient::builder().timeout(timeout).build().map_err(ProviderError::ClientBuild)?;
        let base_url = base_url.unwrap_or(DEFAULT_ANTHROPIC_BASE_URL).trim_end_matches('/');
        Ok(Self { client, endpoint: format!("{base_url}/messages"), api_key, model, retry })
    }

    async fn send_once(&self, prompt: &str) -> Result<String, ProviderError> {
        let request_body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: vec![Message { role: "user", content: prompt }],
        };

        let mut request_builder =
            self.client.post(&self.endpoint).header("anthropic-version", ANTHROPIC_VERSION);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.header("x-api-key", key.expose_secret());
        }

        let response =
            request_builder.json(&request_body).send().await.map_err(ProviderError::Request)?;
        let response = error_for_status(response).await?;
        let messages_response: MessagesResponse =
            response.json().await.map_err(ProviderError::Deserialization)?;

        Ok(messages_response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        debug!(
            event_name = "llm.request.started",
            provider = "anthropic",
            model = %self.model,
            "sending messages request"
        );
        Ok(self.retry.run("anthropic", || self.send_once(prompt)).await?)
    }

    fn model_version(&self) -> &str {
        &self.model
    }
}
