//! Domain layer for consilium
//!
//! This crate contains the core business logic, entities, and value objects
//! of the consultation engine. It has no dependencies on infrastructure or
//! serving concerns.
//!
//! # Core Concepts
//!
//! ## Panel Discussion
//!
//! A clinical [`Case`](core::case::Case) is discussed by a panel of
//! role-specialized agents over bounded rounds. Each agent contributes a
//! [`Turn`](discussion::Turn); a round's turns are evaluated for consensus.
//!
//! ## Consensus
//!
//! A round converges when the minimum pairwise opinion similarity meets the
//! agreement threshold and no safety veto or consistency flag is raised.
//!
//! ## Knowledge
//!
//! Concluded sessions are distilled into [`KnowledgeEntry`](knowledge::KnowledgeEntry)
//! records, partitioned into validated answers and reasoning chains.

pub mod consensus;
pub mod core;
pub mod discussion;
pub mod knowledge;
pub mod prompt;
pub mod session;

// Re-export commonly used types
pub use consensus::{
    result::{ConsensusResult, ConsensusVerdict},
    similarity::{cosine_similarity, min_pairwise_similarity},
};
pub use core::{
    case::{Case, CaseId},
    error::DomainError,
    role::{RoleId, RoleKind, RoleProfile},
};
pub use discussion::{
    parsing::{parse_consistency_response, parse_opinion_response, parse_safety_response},
    round::Round,
    transcript::Transcript,
    turn::Turn,
};
pub use knowledge::{
    entry::{EntryId, KnowledgeEntry, KnowledgeKind, ValidationStatus},
    partition::Partition,
};
pub use prompt::template::PromptTemplate;
pub use session::{
    record::SessionRecord,
    state::SessionState,
};
