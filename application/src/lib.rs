//! Application layer for consilium
//!
//! This crate contains the discussion orchestration use cases, the port
//! definitions for external backends, and the application configuration.
//! It depends only on the domain layer.

pub mod agent;
pub mod config;
pub mod knowledge;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use agent::{AgentRole, GenerationError};
pub use config::{ConfigError, DiscussionConfig};
pub use knowledge::{KnowledgeStore, StoreError};
pub use ports::{
    completion::{BackendError, CompletionBackend},
    embedding::EmbeddingBackend,
    partition_store::PartitionStore,
    progress::{DiscussionProgress, NoProgress},
    transcript_log::{NoTranscriptLog, TranscriptEvent, TranscriptLogger},
};
pub use use_cases::{
    consensus::ConsensusEngine,
    distill::SelfEvolutionLoop,
    run_discussion::{DiscussionError, DiscussionManager},
};
