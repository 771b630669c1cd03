//! Use cases: the discussion orchestration engine.

pub mod consensus;
pub mod distill;
pub mod run_discussion;

pub use consensus::ConsensusEngine;
pub use distill::SelfEvolutionLoop;
pub use run_discussion::{DiscussionError, DiscussionManager};
