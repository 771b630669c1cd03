//! HTTP adapters for the completion and embedding backends.

pub mod http_completion;
pub mod http_embedding;

pub use http_completion::HttpCompletionBackend;
pub use http_embedding::HttpEmbeddingBackend;

use consilium_application::ports::completion::BackendError;

/// Map a reqwest transport error onto the port's error taxonomy.
pub(crate) fn map_transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::Connection(e.to_string())
    } else {
        BackendError::Api(e.to_string())
    }
}

/// Map an HTTP status onto the port's error taxonomy.
pub(crate) fn map_status(status: reqwest::StatusCode, body: String) -> BackendError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        BackendError::RateLimited
    } else if status == reqwest::StatusCode::REQUEST_TIMEOUT {
        BackendError::Timeout
    } else {
        BackendError::Api(format!("HTTP {}: {}", status, body))
    }
}
