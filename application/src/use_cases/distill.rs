//! Post-session knowledge distillation.
//!
//! After a session concludes, the transcript is distilled into knowledge
//! entries: a converged session contributes its consolidated answer (as a
//! validated fact) plus a reasoning-chain summary (provisional); an
//! escalated session contributes only the reasoning chain — an answer forced
//! through a single-decision override is never auto-validated. Deadlocked
//! and aborted sessions contribute nothing.

use crate::knowledge::store::{KnowledgeStore, StoreError};
use consilium_domain::discussion::transcript::Transcript;
use consilium_domain::knowledge::entry::{EntryDraft, EntryId};
use consilium_domain::session::record::SessionRecord;
use consilium_domain::session::state::SessionState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Distills concluded sessions into the knowledge store and prunes stale
/// entries.
pub struct SelfEvolutionLoop {
    knowledge: Arc<KnowledgeStore>,
    /// Retract provisional entries unused for longer than this
    prune_after: Option<Duration>,
}

impl SelfEvolutionLoop {
    pub fn new(knowledge: Arc<KnowledgeStore>) -> Self {
        Self {
            knowledge,
            prune_after: None,
        }
    }

    pub fn with_prune_after(mut self, prune_after: Duration) -> Self {
        self.prune_after = Some(prune_after);
        self
    }

    /// Distill a concluded session.
    ///
    /// Writes go through the store's all-or-nothing session commit and
    /// inherit its deduplication/reinforcement behavior. Returns the ids of
    /// the entries written (reinforced ids included), in write order.
    pub async fn distill(&self, record: &SessionRecord) -> Result<Vec<EntryId>, StoreError> {
        if !record.state.is_distillable() {
            return Ok(Vec::new());
        }

        let mut drafts = Vec::new();

        if record.state == SessionState::Converged
            && let Some(answer) = &record.final_answer
        {
            drafts.push(EntryDraft::correct_answer(
                record.case_id.clone(),
                answer.clone(),
            ));
        }

        drafts.push(EntryDraft::reasoning_chain(
            record.case_id.clone(),
            summarize_reasoning(&record.transcript, record.final_answer.as_deref()),
        ));

        let ids = self.knowledge.commit_session(drafts).await?;
        info!(case = %record.case_id, entries = ids.len(), "Distilled session into knowledge store");

        // Pruning is maintenance, not part of the session's write set: a
        // prune failure must not retroactively fail the distillation
        if let Some(prune_after) = self.prune_after {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            if let Err(e) = self
                .knowledge
                .prune_stale(now, prune_after.as_millis() as u64)
                .await
            {
                warn!("Knowledge pruning failed: {}", e);
            }
        }

        Ok(ids)
    }
}

/// Round-by-round reasoning summary: initial hypotheses, analysis process,
/// final conclusion.
fn summarize_reasoning(transcript: &Transcript, final_answer: Option<&str>) -> String {
    let mut summary = format!("Case {}\n", transcript.case_id());

    for round in transcript.rounds() {
        if round.number == 1 {
            summary.push_str("Initial hypotheses:\n");
        } else {
            summary.push_str(&format!("Round {} analysis:\n", round.number));
        }
        for turn in &round.turns {
            summary.push_str(&format!("  [{}] {}\n", turn.role, turn.opinion));
        }
    }

    if let Some(answer) = final_answer {
        summary.push_str(&format!("Conclusion: {}\n", answer));
    }

    summary
}
