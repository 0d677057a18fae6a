/// Chat-completion client abstraction
///
/// Everything that asks an LLM something goes through [`CompletionClient`], so
/// prompt logic can be tested against a mock.
use crate::{
    error::{AppError, AppResult},
    models::{ChatRequest, ChatResponse},
};
use regex::Regex;
use reqwest::Client as HttpClient;
use std::sync::OnceLock;
use std::time::Duration;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends a chat request and returns the first choice's text
    ///
    /// A reply without content yields an empty string.
    async fn complete(&self, request: ChatRequest) -> AppResult<String>;
}

/// OpenAI chat completions (`POST {base}/chat/completions`)
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_key,
            api_url,
        })
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, model = %request.model, "OpenAI request failed");
            return Err(AppError::ExternalApi(format!(
                "OpenAI returned status {}: {}",
                status, body
            )));
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        tracing::debug!(model = %request.model, chars = content.len(), "Completion received");

        Ok(content)
    }
}

/// First flat `{...}` object in a reply
pub fn extract_json_object(reply: &str) -> Option<&str> {
    static OBJECT: OnceLock<Regex> = OnceLock::new();
    let re = OBJECT.get_or_init(|| Regex::new(r"\{[^{}]+\}").expect("valid regex"));
    re.find(reply).map(|m| m.as_str())
}

/// Outermost `[...]` span in a reply
pub fn extract_json_array(reply: &str) -> Option<&str> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    (end > start).then(|| &reply[start..=end])
}
