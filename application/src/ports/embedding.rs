//! Embedding backend port
//!
//! Defines the interface for the vector-embedding service. Every call must
//! return a vector of the model's fixed dimensionality; the knowledge store
//! rejects mismatched vectors.

use super::completion::BackendError;
use async_trait::async_trait;

/// Gateway to the embedding model
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a single text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError>;

    /// Embed a batch of texts.
    ///
    /// Default implementation calls [`embed`](Self::embed) sequentially;
    /// adapters with a batch endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
