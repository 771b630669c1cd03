//! The knowledge store: versioned, queryable repository of validated facts
//! and reasoning chains, backed by an embedding index.

pub mod store;

pub use store::{KnowledgeStore, StoreError};
