//! Progress notification port
//!
//! Defines the interface for reporting discussion progress. Implementations
//! live in the serving layer (console output, a web UI) — the engine only
//! emits callbacks.

use consilium_domain::consensus::result::ConsensusResult;
use consilium_domain::core::role::RoleId;
use consilium_domain::session::state::SessionState;

/// Callback for progress updates during a discussion session
pub trait DiscussionProgress: Send + Sync {
    /// Called when a round starts
    fn on_round_start(&self, round: u32, total_roles: usize);

    /// Called when a role's turn completes (or fails) within a round
    fn on_turn_complete(&self, round: u32, role: &RoleId, success: bool);

    /// Called when a round's verdict is available
    fn on_verdict(&self, round: u32, result: &ConsensusResult);

    /// Called once when the session reaches a terminal state
    fn on_session_end(&self, state: SessionState) {
        let _ = state;
    }
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl DiscussionProgress for NoProgress {
    fn on_round_start(&self, _round: u32, _total_roles: usize) {}
    fn on_turn_complete(&self, _round: u32, _role: &RoleId, _success: bool) {}
    fn on_verdict(&self, _round: u32, _result: &ConsensusResult) {}
}
