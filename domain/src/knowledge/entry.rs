//! Knowledge entries.

use crate::core::case::CaseId;
use serde::{Deserialize, Serialize};

/// Identifier of a stored knowledge entry (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of knowledge an entry carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    /// A consolidated final answer the panel converged on
    CorrectAnswer,
    /// A round-by-round reasoning summary
    ReasoningChain,
}

/// Validation lifecycle of an entry
///
/// Entries are never physically deleted; `Retracted` removes an entry from
/// retrieval while retaining it for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Provisional,
    Validated,
    Retracted,
}

impl ValidationStatus {
    pub fn is_retracted(&self) -> bool {
        matches!(self, ValidationStatus::Retracted)
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, ValidationStatus::Validated)
    }
}

/// A unit of distilled knowledge (Entity)
///
/// Created by the evolution loop after a session concludes (or by an explicit
/// seeding import). The only mutation the store performs after creation is a
/// status change plus the reinforcement timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: EntryId,
    pub kind: KnowledgeKind,
    /// The case this entry was distilled from
    pub source_case: CaseId,
    /// Embedding of `text` under the store's configured model
    pub embedding: Vec<f32>,
    pub text: String,
    pub status: ValidationStatus,
    /// Creation timestamp (milliseconds since epoch)
    pub created_at: u64,
    /// Last retrieval-reinforcement timestamp (milliseconds since epoch)
    pub last_used: u64,
    /// When the entry was promoted to validated, if ever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<u64>,
}

impl KnowledgeEntry {
    /// Whether this entry is eligible for retrieval under the given filter.
    pub fn retrievable(&self, validated_only: bool) -> bool {
        if self.status.is_retracted() {
            return false;
        }
        !validated_only || self.status.is_validated()
    }

    /// Short label used when rendering retrieved entries into prompts.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            KnowledgeKind::CorrectAnswer => "validated answer",
            KnowledgeKind::ReasoningChain => "reasoning chain",
        }
    }
}

/// A not-yet-stored entry produced by distillation or seeding.
///
/// The store assigns the id, computes the embedding, and stamps timestamps
/// when the draft is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub kind: KnowledgeKind,
    pub source_case: CaseId,
    pub text: String,
    /// Status the entry should carry when inserted fresh
    pub status: ValidationStatus,
}

impl EntryDraft {
    pub fn correct_answer(source_case: CaseId, text: impl Into<String>) -> Self {
        Self {
            kind: KnowledgeKind::CorrectAnswer,
            source_case,
            text: text.into(),
            status: ValidationStatus::Validated,
        }
    }

    pub fn reasoning_chain(source_case: CaseId, text: impl Into<String>) -> Self {
        Self {
            kind: KnowledgeKind::ReasoningChain,
            source_case,
            text: text.into(),
            status: ValidationStatus::Provisional,
        }
    }

    /// The partition a draft of this kind belongs to.
    pub fn partition(&self) -> crate::knowledge::partition::Partition {
        match self.kind {
            KnowledgeKind::CorrectAnswer => crate::knowledge::partition::Partition::CorrectKb,
            KnowledgeKind::ReasoningChain => crate::knowledge::partition::Partition::ChainKb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: ValidationStatus) -> KnowledgeEntry {
        KnowledgeEntry {
            id: EntryId::new("e-1"),
            kind: KnowledgeKind::CorrectAnswer,
            source_case: CaseId::new("c-1"),
            embedding: vec![1.0, 0.0],
            text: "answer".to_string(),
            status,
            created_at: 1,
            last_used: 1,
            validated_at: None,
        }
    }

    #[test]
    fn test_retracted_never_retrievable() {
        let e = entry(ValidationStatus::Retracted);
        assert!(!e.retrievable(false));
        assert!(!e.retrievable(true));
    }

    #[test]
    fn test_provisional_excluded_from_validated_only() {
        let e = entry(ValidationStatus::Provisional);
        assert!(e.retrievable(false));
        assert!(!e.retrievable(true));
    }

    #[test]
    fn test_draft_constructors() {
        let correct = EntryDraft::correct_answer(CaseId::new("c"), "a");
        assert_eq!(correct.status, ValidationStatus::Validated);
        assert_eq!(
            correct.partition(),
            crate::knowledge::partition::Partition::CorrectKb
        );

        let chain = EntryDraft::reasoning_chain(CaseId::new("c"), "r");
        assert_eq!(chain.status, ValidationStatus::Provisional);
        assert_eq!(
            chain.partition(),
            crate::knowledge::partition::Partition::ChainKb
        );
    }
}
