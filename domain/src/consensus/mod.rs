//! Consensus domain: similarity math and round verdicts.

pub mod result;
pub mod similarity;

pub use result::{ConsensusResult, ConsensusVerdict};
pub use similarity::{cosine_similarity, min_pairwise_similarity};
