use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{error_for_status, ProviderError};
use crate::llm::LlmClient;
use crate::retry::RetryPolicy;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

/// Client for OpenAI and servers exposing the same chat completions API
/// (Ollama's `/v1` endpoint included).
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: ReqwestClient,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: Option<&str>,
        api_key: Option<SecretString>,
        model: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let client =
            ReqwestClient::builder().timeout(timeout).build().map_err(ProviderError::ClientBuild)?;
        let base_url = base_url.unwrap_or(DEFAULT_OPENAI_BASE_URL).trim_end_matches('/');
        Ok(Self {
            client,
            endpoint: format!("{base_url}/chat/completions"),
            api_key,
            model,
            retry,
        })
    }

    async fn send_once(&self, prompt: &str) -> Result<String, ProviderError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
            temperature: 0.0,
            stream: false,
        };

        let mut request_builder = self.client.post(&self.endpoint);
        if let Some(key) = &self.api_key {
            request_builder = request_builder.bearer_auth(key.expose_secret());
        }

        let response =
            request_builder.json(&request_body).send().await.map_err(ProviderError::Request)?;
        let response = error_for_status(response).await?;
        let chat_response: ChatResponse =
            response.json().await.map_err(ProviderError::Deserialization)?;

        Ok(chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        debug!(
            event_name = "llm.request.started",
            provider = "openai",
            model = %self.model,
            "sending chat completion request"
        );
        Ok(self.retry.run("openai", || self.send_once(prompt)).await?)
    }

    fn model_version(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::OpenAiCompatibleClient;
    use crate::llm::LlmClient;
    use crate::retry::RetryPolicy;

    fn client(
        server: &MockServer,
        api_key: Option<&str>,
        max_retries: u32,
    ) -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(
            Some(&format!("{}/v1/", server.uri())),
            api_key.map(|key| SecretString::from(key.to_string())),
            "gpt-3.5-turbo".to_string(),
            Duration::from_secs(5),
            RetryPolicy { max_retries, base_delay_ms: 1, max_delay_ms: 2 },
        )
        .expect("client builds")
    }

    #[tokio::test]
    async fn completion_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "Is the sky blue?"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Yes."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client(&server, Some("sk-test"), 0)
            .complete("Is the sky blue?")
            .await
            .expect("completion");
        assert_eq!(answer, "Yes.");
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "recovered"}}]
            })))
            .mount(&server)
            .await;

        let answer = client(&server, None, 1).complete("hi").await.expect("completion");
        assert_eq!(answer, "recovered");
    }

    #[tokio::test]
    async fn client_errors_surface_the_api_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let error = client(&server, Some("sk-bad"), 3).complete("hi").await.expect_err("401");
        let message = error.to_string();
        assert!(message.contains("401"), "unexpected error: {message}");
        assert!(message.contains("invalid api key"), "unexpected error: {message}");
    }
}
