//! Turn: one agent's contribution within a round.

use super::current_timestamp;
use crate::core::role::RoleId;
use serde::{Deserialize, Serialize};

/// A single agent contribution within a round (Entity, immutable)
///
/// A turn is created once by the agent that produced it and owned by the
/// session transcript; it is never mutated after creation.
///
/// # Example
///
/// ```
/// use consilium_domain::discussion::Turn;
/// use consilium_domain::core::role::RoleId;
///
/// let turn = Turn::new(RoleId::PrimaryCare, 1, "Likely early-stage NSCLC; refer to oncology.")
///     .with_confidence(0.85);
///
/// assert_eq!(turn.round, 1);
/// assert!(!turn.veto);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// The role that produced this turn
    pub role: RoleId,
    /// Round number this turn belongs to (1-indexed)
    pub round: u32,
    /// The opinion / assessment / annotation text
    pub opinion: String,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f64,
    /// Safety veto raised by this turn (safety role only)
    #[serde(default)]
    pub veto: bool,
    /// Inconsistency flagged by this turn (reviewer role only)
    #[serde(default)]
    pub inconsistent: bool,
    /// Creation timestamp (milliseconds since epoch)
    pub timestamp: u64,
}

impl Turn {
    pub fn new(role: RoleId, round: u32, opinion: impl Into<String>) -> Self {
        Self {
            role,
            round,
            opinion: opinion.into(),
            confidence: 0.5,
            veto: false,
            inconsistent: false,
            timestamp: current_timestamp(),
        }
    }

    /// Set the confidence score, clamped to 0.0–1.0
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Mark this turn as a safety veto
    pub fn with_veto(mut self) -> Self {
        self.veto = true;
        self
    }

    /// Mark this turn as flagging a reasoning inconsistency
    pub fn with_inconsistency(mut self) -> Self {
        self.inconsistent = true;
        self
    }
}
