//! Completion backend port
//!
//! Defines the interface for the language-model completion service.

use async_trait::async_trait;
use consilium_domain::core::role::RoleProfile;
use std::time::Duration;
use thiserror::Error;

/// Errors a backend call can produce
///
/// `Timeout` and `RateLimited` are retryable up to the configured retry
/// budget; the rest fail the call immediately.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend call timed out")]
    Timeout,

    #[error("Backend rate limited the request")]
    RateLimited,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Backend returned a malformed response: {0}")]
    Malformed(String),

    #[error("Backend request failed: {0}")]
    Api(String),
}

impl BackendError {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout | BackendError::RateLimited | BackendError::Connection(_)
        )
    }
}

/// Gateway to the completion model
///
/// The role profile carries the instructions used as the system prompt; the
/// timeout is the caller's deadline for this single attempt.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        profile: &RoleProfile,
        timeout: Duration,
    ) -> Result<String, BackendError>;
}
