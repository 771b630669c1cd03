//! OpenAI-style embeddings adapter.

use super::{map_status, map_transport_error};
use async_trait::async_trait;
use consilium_application::ports::completion::BackendError;
use consilium_application::ports::embedding::EmbeddingBackend;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Embedding backend over an OpenAI-compatible HTTP endpoint
pub struct HttpEmbeddingBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl HttpEmbeddingBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let mut base_url = base_url.into();
        if base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    async fn request(&self, inputs: Vec<&str>) -> Result<Vec<Vec<f32>>, BackendError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        debug!(model = %self.model, "Embedding request");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, body));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;

        if parsed.data.is_empty() {
            return Err(BackendError::Malformed(
                "embedding response carried no data".to_string(),
            ));
        }
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        let mut vectors = self.request(vec![text]).await?;
        Ok(vectors.swap_remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts.iter().map(String::as_str).collect())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserialization() {
        let json = r#"{"data": [{"embedding": [0.1, -0.2, 0.3]}]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 3);
    }
}
