//! Consensus evaluation.
//!
//! A round converges when the minimum pairwise semantic similarity across
//! all panelist opinions meets the agreement threshold, no safety veto was
//! raised, and the consistency reviewer did not flag the round. A safety
//! veto short-circuits everything to a terminal escalation.

use crate::agent::retry::with_retries;
use crate::ports::completion::BackendError;
use crate::ports::embedding::EmbeddingBackend;
use consilium_domain::consensus::result::{ConsensusResult, consolidate_answer};
use consilium_domain::consensus::similarity::min_pairwise_similarity;
use consilium_domain::core::role::{RoleId, RoleKind, RoleProfile};
use consilium_domain::discussion::round::Round;
use consilium_domain::discussion::turn::Turn;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Compares a round's opinions and decides: converged, diverging, or
/// deadlocked.
pub struct ConsensusEngine {
    embedder: Arc<dyn EmbeddingBackend>,
    agreement_threshold: f64,
    retry_limit: u32,
    /// Role kind lookup, from the configured panel
    role_kinds: HashMap<RoleId, RoleKind>,
}

impl ConsensusEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        agreement_threshold: f64,
        retry_limit: u32,
        panel: &[RoleProfile],
    ) -> Self {
        Self {
            embedder,
            agreement_threshold,
            retry_limit,
            role_kinds: panel.iter().map(|p| (p.id.clone(), p.kind)).collect(),
        }
    }

    /// Evaluate a completed round.
    ///
    /// `max_rounds` marks the last permitted round: failing to converge
    /// there is a deadlock rather than a divergence.
    pub async fn evaluate(
        &self,
        round: &Round,
        max_rounds: u32,
    ) -> Result<ConsensusResult, BackendError> {
        // A veto is terminal regardless of similarity
        if round.has_veto() {
            debug!(round = round.number, "Safety veto short-circuits evaluation");
            return Ok(ConsensusResult::vetoed());
        }

        let panelist_turns: Vec<&Turn> = round
            .turns
            .iter()
            .filter(|t| {
                self.role_kinds.get(&t.role).copied() == Some(RoleKind::Panelist)
            })
            .collect();

        let mut embeddings = Vec::with_capacity(panelist_turns.len());
        for turn in &panelist_turns {
            let vector =
                with_retries(self.retry_limit, || self.embedder.embed(&turn.opinion)).await?;
            embeddings.push(vector);
        }

        let agreement = min_pairwise_similarity(&embeddings);
        let converged = agreement >= self.agreement_threshold && !round.has_inconsistency();
        debug!(
            round = round.number,
            agreement,
            threshold = self.agreement_threshold,
            inconsistent = round.has_inconsistency(),
            "Evaluated round"
        );

        if converged && let Some(answer) = consolidate_answer(&panelist_turns) {
            return Ok(ConsensusResult::converged(agreement, answer));
        }

        if round.number >= max_rounds {
            Ok(ConsensusResult::deadlocked(agreement))
        } else {
            Ok(ConsensusResult::diverging(agreement))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use consilium_domain::consensus::result::ConsensusVerdict;

    /// Maps the first word of a text to a fixed vector.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingBackend for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
            Ok(match text.split_whitespace().next().unwrap_or("") {
                "alpha" => vec![1.0, 0.0],
                "beta" => vec![0.0, 1.0],
                _ => vec![0.707, 0.707],
            })
        }
    }

    fn engine(threshold: f64) -> ConsensusEngine {
        ConsensusEngine::new(
            Arc::new(KeywordEmbedder),
            threshold,
            0,
            &RoleProfile::default_panel(),
        )
    }

    fn panel_turn(role: RoleId, round: u32, opinion: &str, confidence: f64) -> Turn {
        Turn::new(role, round, opinion).with_confidence(confidence)
    }

    #[tokio::test]
    async fn test_agreeing_round_converges() {
        let round = Round::new(
            1,
            vec![
                panel_turn(RoleId::PrimaryCare, 1, "alpha biopsy", 0.8),
                panel_turn(RoleId::LeadPhysician, 1, "alpha resection", 0.9),
            ],
        );

        let result = engine(0.8).evaluate(&round, 3).await.unwrap();
        assert_eq!(result.verdict, ConsensusVerdict::Converged);
        assert!(result.agreement >= 0.8);
        // Lead physician's text verbatim
        assert_eq!(result.answer.as_deref(), Some("alpha resection"));
    }

    #[tokio::test]
    async fn test_disagreeing_round_diverges() {
        let round = Round::new(
            1,
            vec![
                panel_turn(RoleId::PrimaryCare, 1, "alpha watchful waiting", 0.8),
                panel_turn(RoleId::LeadPhysician, 1, "beta chemotherapy", 0.9),
            ],
        );

        let result = engine(0.8).evaluate(&round, 3).await.unwrap();
        assert_eq!(result.verdict, ConsensusVerdict::Diverging);
        assert!(result.answer.is_none());
    }

    #[tokio::test]
    async fn test_last_round_without_agreement_deadlocks() {
        let round = Round::new(
            2,
            vec![
                panel_turn(RoleId::PrimaryCare, 2, "alpha a", 0.8),
                panel_turn(RoleId::LeadPhysician, 2, "beta b", 0.9),
            ],
        );

        let result = engine(0.8).evaluate(&round, 2).await.unwrap();
        assert_eq!(result.verdict, ConsensusVerdict::Deadlocked);
    }

    #[tokio::test]
    async fn test_veto_short_circuits() {
        let round = Round::new(
            1,
            vec![
                panel_turn(RoleId::PrimaryCare, 1, "alpha x", 0.8),
                panel_turn(RoleId::LeadPhysician, 1, "alpha x", 0.9),
                Turn::new(RoleId::SafetyEthics, 1, "contraindicated").with_veto(),
            ],
        );

        let result = engine(0.8).evaluate(&round, 3).await.unwrap();
        assert!(result.is_veto());
        assert_eq!(result.escalate_to, Some(RoleId::LeadPhysician));
    }

    #[tokio::test]
    async fn test_inconsistency_flag_forces_divergence() {
        let round = Round::new(
            2,
            vec![
                panel_turn(RoleId::PrimaryCare, 2, "alpha x", 0.8),
                panel_turn(RoleId::LeadPhysician, 2, "alpha x", 0.9),
                Turn::new(RoleId::CotReviewer, 2, "contradicts round 1").with_inconsistency(),
            ],
        );

        let result = engine(0.8).evaluate(&round, 3).await.unwrap();
        assert_eq!(result.verdict, ConsensusVerdict::Diverging);
    }

    #[tokio::test]
    async fn test_safety_assessment_not_in_similarity_matrix() {
        // Safety text embeds to an orthogonal vector; it must not block
        // convergence of the agreeing panelists
        let round = Round::new(
            1,
            vec![
                panel_turn(RoleId::PrimaryCare, 1, "alpha x", 0.8),
                panel_turn(RoleId::LeadPhysician, 1, "alpha y", 0.9),
                Turn::new(RoleId::SafetyEthics, 1, "beta no risks seen"),
            ],
        );

        let result = engine(0.8).evaluate(&round, 3).await.unwrap();
        assert_eq!(result.verdict, ConsensusVerdict::Converged);
    }

    #[tokio::test]
    async fn test_highest_confidence_wins_without_lead() {
        let panel = vec![
            RoleProfile::new(RoleId::PrimaryCare, RoleKind::Panelist, "a"),
            RoleProfile::new(
                RoleId::Specialist("pulmonology".to_string()),
                RoleKind::Panelist,
                "b",
            ),
        ];
        let engine = ConsensusEngine::new(Arc::new(KeywordEmbedder), 0.8, 0, &panel);

        let round = Round::new(
            1,
            vec![
                panel_turn(RoleId::PrimaryCare, 1, "alpha low", 0.4),
                panel_turn(
                    RoleId::Specialist("pulmonology".to_string()),
                    1,
                    "alpha high",
                    0.95,
                ),
            ],
        );

        let result = engine.evaluate(&round, 3).await.unwrap();
        assert_eq!(result.answer.as_deref(), Some("alpha high"));
    }
}
