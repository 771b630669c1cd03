//! Console progress reporting for discussion sessions.

use consilium_application::ports::progress::DiscussionProgress;
use consilium_domain::consensus::result::ConsensusResult;
use consilium_domain::core::role::RoleId;
use consilium_domain::session::state::SessionState;

/// Prints round-by-round progress to stderr.
pub struct ConsoleProgress;

impl DiscussionProgress for ConsoleProgress {
    fn on_round_start(&self, round: u32, total_roles: usize) {
        eprintln!("-- Round {} ({} seats) --", round, total_roles);
    }

    fn on_turn_complete(&self, _round: u32, role: &RoleId, success: bool) {
        let marker = if success { "ok" } else { "FAILED" };
        eprintln!("   {:<16} {}", role.to_string(), marker);
    }

    fn on_verdict(&self, round: u32, result: &ConsensusResult) {
        if result.is_veto() {
            eprintln!("   round {}: safety veto -> escalating", round);
        } else {
            eprintln!(
                "   round {}: {} (agreement {:.3})",
                round, result.verdict, result.agreement
            );
        }
    }

    fn on_session_end(&self, state: SessionState) {
        eprintln!("-- Session {} --", state);
    }
}
