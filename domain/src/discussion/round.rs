//! Round: the ordered set of turns produced in one pass over the panel.

use super::turn::Turn;
use crate::consensus::result::ConsensusResult;
use crate::core::role::RoleId;
use serde::{Deserialize, Serialize};

/// One discussion round: the turns of every participating role, in the
/// configured panel order, plus the consensus verdict once evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// Round number (1-indexed)
    pub number: u32,
    /// Turns in configured role order — never completion order
    pub turns: Vec<Turn>,
    /// Verdict for this round, set after evaluation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ConsensusResult>,
}

impl Round {
    pub fn new(number: u32, turns: Vec<Turn>) -> Self {
        Self {
            number,
            turns,
            verdict: None,
        }
    }

    pub fn with_verdict(mut self, verdict: ConsensusResult) -> Self {
        self.verdict = Some(verdict);
        self
    }

    /// Find the turn produced by a specific role, if present
    pub fn turn_for(&self, role: &RoleId) -> Option<&Turn> {
        self.turns.iter().find(|t| &t.role == role)
    }

    /// Whether any turn in this round raised a safety veto
    pub fn has_veto(&self) -> bool {
        self.turns.iter().any(|t| t.veto)
    }

    /// Whether any turn in this round flagged a reasoning inconsistency
    pub fn has_inconsistency(&self) -> bool {
        self.turns.iter().any(|t| t.inconsistent)
    }
}
