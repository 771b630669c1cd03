//! Transcript: the authoritative, append-only record of a session.

use super::round::Round;
use crate::core::case::CaseId;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Append-only sequence of rounds for one case (Entity)
///
/// Round numbers are strictly increasing by 1, starting at 1, with no gaps —
/// [`Transcript::push_round`] rejects anything else. The transcript grows
/// monotonically during the session and is frozen when the session reaches a
/// terminal state.
///
/// # Example
///
/// ```
/// use consilium_domain::discussion::{Round, Transcript};
///
/// let mut transcript = Transcript::new("case-001");
/// transcript.push_round(Round::new(1, vec![])).unwrap();
/// transcript.push_round(Round::new(2, vec![])).unwrap();
/// assert!(transcript.push_round(Round::new(4, vec![])).is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    case_id: CaseId,
    rounds: Vec<Round>,
}

impl Transcript {
    pub fn new(case_id: impl Into<CaseId>) -> Self {
        Self {
            case_id: case_id.into(),
            rounds: Vec::new(),
        }
    }

    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Number of the next round to be played (1 for a fresh transcript)
    pub fn next_round_number(&self) -> u32 {
        self.rounds.last().map(|r| r.number + 1).unwrap_or(1)
    }

    pub fn last_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// Append a completed round.
    ///
    /// Fails with [`DomainError::NonContiguousRound`] unless the round number
    /// is exactly one past the previous round (or 1 for the first round).
    pub fn push_round(&mut self, round: Round) -> Result<(), DomainError> {
        let expected = self.next_round_number();
        if round.number != expected {
            return Err(DomainError::NonContiguousRound {
                expected,
                got: round.number,
            });
        }
        self.rounds.push(round);
        Ok(())
    }
}
