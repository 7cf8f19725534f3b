//! OpenAI-compatible chat-completions provider.
//!
//! Speaks the plain `/chat/completions` shape most gateways accept. The
//! retry class of a failure is decided here (transport and server errors
//! retry, auth and malformed-request errors do not); the gateway owns the
//! retry loop itself.

use crate::llm::{ProviderError, TextGenerator, TierSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Provider configured with a base URL and credential
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn completions_url(&self) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        if trimmed.ends_with("/v1") {
            format!("{trimmed}/chat/completions")
        } else {
            format!("{trimmed}/v1/chat/completions")
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatProvider {
    async fn generate(
        &self,
        prompt: &str,
        settings: &TierSettings,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: settings.max_output_tokens,
            temperature: settings.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::retryable(format!("transport error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            let message = format!("HTTP {status}: {snippet}");
            // Rate limits and server hiccups retry; auth and bad requests do not
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(ProviderError::retryable(message))
            } else {
                Err(ProviderError::fatal(message))
            };
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::retryable(format!("response read failed: {e}")))?;
        let parsed: ChatResponse = serde_json::from_value(body)
            .map_err(|e| ProviderError::fatal(format!("unexpected response shape: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::fatal("response contained no content"))
    }
}
