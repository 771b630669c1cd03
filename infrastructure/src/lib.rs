//! Infrastructure layer for consilium
//!
//! External adapters behind the application layer's ports: HTTP completion
//! and embedding backends, file-backed knowledge persistence, JSONL
//! transcript logging, and configuration loading.

pub mod config;
pub mod logging;
pub mod providers;
pub mod storage;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig};
pub use logging::JsonlTranscriptLogger;
pub use providers::{HttpCompletionBackend, HttpEmbeddingBackend};
pub use storage::JsonPartitionStore;
