//! OpenAI-style chat-completions adapter.
//!
//! Speaks the `v1/chat/completions` wire format against any compatible
//! endpoint. The role profile's instructions become the system message; the
//! caller's per-attempt timeout is enforced at the request level.

use super::{map_status, map_transport_error};
use async_trait::async_trait;
use consilium_application::ports::completion::{BackendError, CompletionBackend};
use consilium_domain::core::role::RoleProfile;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Completion backend over an OpenAI-compatible HTTP endpoint
pub struct HttpCompletionBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpCompletionBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(
        &self,
        prompt: &str,
        profile: &RoleProfile,
        timeout: Duration,
    ) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &profile.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        debug!(model = %self.model, role = %profile.id, "Completion request");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Malformed("response carried no choices".to_string()))
    }
}
