//! Consensus verdicts and answer consolidation.

use crate::core::role::RoleId;
use crate::discussion::turn::Turn;
use serde::{Deserialize, Serialize};

/// Verdict of a consensus evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusVerdict {
    /// Agreement threshold met, discussion concludes
    Converged,
    /// No agreement yet, discussion continues
    Diverging,
    /// Final permitted round passed without agreement
    Deadlocked,
}

impl ConsensusVerdict {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConsensusVerdict::Converged)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConsensusVerdict::Diverging)
    }
}

impl std::fmt::Display for ConsensusVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsensusVerdict::Converged => write!(f, "converged"),
            ConsensusVerdict::Diverging => write!(f, "diverging"),
            ConsensusVerdict::Deadlocked => write!(f, "deadlocked"),
        }
    }
}

/// Result of evaluating one round
///
/// Carries the verdict, the agreement score (minimum pairwise opinion
/// similarity), the consolidated answer when the round converged, and the
/// escalation target when a safety veto short-circuited evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub verdict: ConsensusVerdict,
    /// Minimum pairwise opinion similarity in the evaluated round
    pub agreement: f64,
    /// Consolidated answer text, present when converged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Role the session escalates to, present on safety veto
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalate_to: Option<RoleId>,
}

impl ConsensusResult {
    pub fn converged(agreement: f64, answer: impl Into<String>) -> Self {
        Self {
            verdict: ConsensusVerdict::Converged,
            agreement,
            answer: Some(answer.into()),
            escalate_to: None,
        }
    }

    pub fn diverging(agreement: f64) -> Self {
        Self {
            verdict: ConsensusVerdict::Diverging,
            agreement,
            answer: None,
            escalate_to: None,
        }
    }

    pub fn deadlocked(agreement: f64) -> Self {
        Self {
            verdict: ConsensusVerdict::Deadlocked,
            agreement,
            answer: None,
            escalate_to: None,
        }
    }

    /// A safety veto: terminal escalation regardless of similarity.
    /// The escalation target is fixed to the lead physician.
    pub fn vetoed() -> Self {
        Self {
            verdict: ConsensusVerdict::Diverging,
            agreement: 0.0,
            answer: None,
            escalate_to: Some(RoleId::LeadPhysician),
        }
    }

    pub fn is_veto(&self) -> bool {
        self.escalate_to.is_some()
    }
}

/// Pick the consolidated answer for a converged round.
///
/// Tie-break: the lead physician's turn verbatim when present, otherwise the
/// highest-confidence turn. Returns `None` for an empty slate (a round with
/// zero opinion turns cannot converge).
pub fn consolidate_answer(turns: &[&Turn]) -> Option<String> {
    if let Some(lead) = turns.iter().find(|t| t.role == RoleId::LeadPhysician) {
        return Some(lead.opinion.clone());
    }

    turns
        .iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|t| t.opinion.clone())
}
