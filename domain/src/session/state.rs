//! Discussion session state machine.
//!
//! The discussion loop is an explicit finite state machine rather than
//! implicit recursive dialogue code, so termination, escalation and abort
//! paths are independently testable.
//!
//! ```text
//!  Init ──> RoundInProgress ──> Converged
//!                │    │ └─────> Escalated   (veto, or diverging past escalate_after)
//!                │    └───────> Deadlocked  (max_rounds without convergence)
//!                └──(loop)      RoundInProgress
//!  any ───────────────────────> Aborted     (generation failure, bad config, cancel)
//! ```

use serde::{Deserialize, Serialize};

/// State of a discussion session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    RoundInProgress,
    Converged,
    Escalated,
    Deadlocked,
    Aborted,
}

impl SessionState {
    /// Terminal states yield a session outcome and freeze the transcript.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Converged
                | SessionState::Escalated
                | SessionState::Deadlocked
                | SessionState::Aborted
        )
    }

    /// Whether a session in this terminal state feeds the evolution loop.
    /// Deadlocked and aborted sessions are logged but never distilled.
    pub fn is_distillable(&self) -> bool {
        matches!(self, SessionState::Converged | SessionState::Escalated)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            // Abort is reachable from any non-terminal state
            (s, Aborted) if !s.is_terminal() => true,
            (Init, RoundInProgress) => true,
            (RoundInProgress, RoundInProgress) => true,
            (RoundInProgress, Converged) => true,
            (RoundInProgress, Escalated) => true,
            (RoundInProgress, Deadlocked) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Init => "init",
            SessionState::RoundInProgress => "round_in_progress",
            SessionState::Converged => "converged",
            SessionState::Escalated => "escalated",
            SessionState::Deadlocked => "deadlocked",
            SessionState::Aborted => "aborted",
        };
        write!(f, "{}", s)
    }
}
