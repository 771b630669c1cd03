//! The discussion manager: drives rounds of agent turns, invokes the
//! consensus engine, enforces safety gating, and terminates or escalates.
//!
//! The session is an explicit state machine: `Init → RoundInProgress →
//! {Converged | Escalated | Deadlocked}`, with `Aborted` reachable from any
//! non-terminal state on an unrecoverable generation failure or
//! cancellation.
//!
//! Within a round the opinion-producing roles are independent of each other
//! and run concurrently; their turns are reassembled in configured panel
//! order — never completion order — before evaluation. The consistency
//! reviewer, when configured, runs after them (from round 2 on) and may only
//! annotate the round.

use crate::agent::role_agent::{AgentRole, GenerationError};
use crate::config::discussion_config::{ConfigError, DiscussionConfig};
use crate::knowledge::store::{KnowledgeStore, StoreError};
use crate::ports::completion::{BackendError, CompletionBackend};
use crate::ports::embedding::EmbeddingBackend;
use crate::ports::progress::{DiscussionProgress, NoProgress};
use crate::ports::transcript_log::{TranscriptEvent, TranscriptLogger};
use crate::use_cases::consensus::ConsensusEngine;
use consilium_domain::consensus::result::ConsensusVerdict;
use consilium_domain::core::case::Case;
use consilium_domain::core::role::RoleId;
use consilium_domain::discussion::round::Round;
use consilium_domain::discussion::transcript::Transcript;
use consilium_domain::discussion::turn::Turn;
use consilium_domain::knowledge::entry::KnowledgeEntry;
use consilium_domain::session::record::SessionRecord;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Entries retrieved per knowledge partition for each agent turn
const RETRIEVAL_K: usize = 3;

/// Errors that can occur while driving a discussion
#[derive(Error, Debug)]
pub enum DiscussionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Knowledge retrieval failed: {0}")]
    Store(#[from] StoreError),

    #[error("Consensus evaluation failed: {0}")]
    Evaluation(#[from] BackendError),

    #[error("Escalation target {0} is not configured")]
    MissingEscalationTarget(RoleId),

    #[error("Transcript error: {0}")]
    Transcript(#[from] consilium_domain::core::error::DomainError),

    #[error("Turn task failed: {0}")]
    Join(String),

    #[error("Session cancelled")]
    Cancelled,
}

/// Drives one or more discussion sessions over a shared knowledge store
pub struct DiscussionManager {
    config: DiscussionConfig,
    /// Opinion-producing seats (panelists + safety), in configured order
    agents: Vec<Arc<AgentRole>>,
    /// The consistency reviewer seat, when configured
    reviewer: Option<Arc<AgentRole>>,
    engine: ConsensusEngine,
    knowledge: Arc<KnowledgeStore>,
    logger: Arc<dyn TranscriptLogger>,
}

impl DiscussionManager {
    /// Build a manager from a validated configuration.
    ///
    /// Fails with [`ConfigError`] before any session exists — an invalid
    /// panel never runs.
    pub fn new(
        config: DiscussionConfig,
        completion: Arc<dyn CompletionBackend>,
        embedding: Arc<dyn EmbeddingBackend>,
        knowledge: Arc<KnowledgeStore>,
        logger: Arc<dyn TranscriptLogger>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let agents = config
            .opinion_roles()
            .map(|profile| {
                Arc::new(AgentRole::new(
                    profile.clone(),
                    Arc::clone(&completion),
                    config.retry_limit,
                    config.call_timeout(),
                ))
            })
            .collect();

        let reviewer = config.reviewer_role().map(|profile| {
            Arc::new(AgentRole::new(
                profile.clone(),
                Arc::clone(&completion),
                config.retry_limit,
                config.call_timeout(),
            ))
        });

        let engine = ConsensusEngine::new(
            Arc::clone(&embedding),
            config.agreement_threshold,
            config.retry_limit,
            &config.agent_roles,
        );

        Ok(Self {
            config,
            agents,
            reviewer,
            engine,
            knowledge,
            logger,
        })
    }

    /// Run a session to a terminal state with no progress reporting.
    pub async fn run(&self, case: Case) -> SessionRecord {
        self.run_with_progress(case, &NoProgress, &CancellationToken::new())
            .await
    }

    /// Run a session to a terminal state.
    ///
    /// Always returns a [`SessionRecord`]; failures surface as the
    /// `Aborted` state with the terminating error kind in `reason` and the
    /// partial transcript attached.
    pub async fn run_with_progress(
        &self,
        case: Case,
        progress: &dyn DiscussionProgress,
        cancel: &CancellationToken,
    ) -> SessionRecord {
        let mut transcript = Transcript::new(case.id().clone());
        info!(case = %case.id(), roles = self.agents.len(), "Session started");
        self.log(&case, "session_started", serde_json::json!({}));

        // Init → RoundInProgress
        for round_num in 1..=self.config.max_rounds {
            // Cancellation is honored at round boundaries only; an in-flight
            // round always completes or aborts as a unit
            if cancel.is_cancelled() {
                return self.conclude_aborted(
                    &case,
                    transcript,
                    DiscussionError::Cancelled,
                    progress,
                );
            }

            self.log(
                &case,
                "round_started",
                serde_json::json!({ "round": round_num }),
            );
            progress.on_round_start(round_num, self.round_seats(round_num));

            let turns = match self.play_round(&case, &transcript, round_num, progress).await {
                Ok(turns) => turns,
                Err(e) => return self.conclude_aborted(&case, transcript, e, progress),
            };

            let round = Round::new(round_num, turns);
            let result = match self.engine.evaluate(&round, self.config.max_rounds).await {
                Ok(result) => result,
                Err(e) => {
                    return self.conclude_aborted(&case, transcript, e.into(), progress);
                }
            };

            progress.on_verdict(round_num, &result);
            self.log(
                &case,
                "round_verdict",
                serde_json::json!({
                    "round": round_num,
                    "verdict": result.verdict.to_string(),
                    "agreement": result.agreement,
                    "veto": result.is_veto(),
                }),
            );

            let round = round.with_verdict(result.clone());
            if let Err(e) = transcript.push_round(round) {
                return self.conclude_aborted(&case, transcript, e.into(), progress);
            }

            // Safety veto: terminal escalation regardless of similarity
            if result.is_veto() {
                let target = result
                    .escalate_to
                    .clone()
                    .unwrap_or(RoleId::LeadPhysician);
                return self.escalate(&case, transcript, target, progress).await;
            }

            match result.verdict {
                ConsensusVerdict::Converged => {
                    let answer = result.answer.unwrap_or_default();
                    info!(case = %case.id(), round = round_num, "Session converged");
                    return self.conclude(
                        &case,
                        SessionRecord::converged(transcript, answer),
                        progress,
                    );
                }
                ConsensusVerdict::Diverging | ConsensusVerdict::Deadlocked => {
                    // Escalation policy beats deadlock when configured
                    if let Some(escalate_after) = self.config.escalate_after
                        && round_num >= escalate_after
                    {
                        return self
                            .escalate(&case, transcript, RoleId::LeadPhysician, progress)
                            .await;
                    }

                    if round_num >= self.config.max_rounds {
                        info!(case = %case.id(), rounds = round_num, "Session deadlocked");
                        return self.conclude(
                            &case,
                            SessionRecord::deadlocked(transcript),
                            progress,
                        );
                    }
                    // RoundInProgress → RoundInProgress
                }
            }
        }

        // max_rounds ≥ 1 guarantees the loop concluded above
        self.conclude(&case, SessionRecord::deadlocked(transcript), progress)
    }

    /// Play one round: fan the opinion seats out concurrently, reassemble
    /// their turns in panel order, then let the reviewer annotate.
    async fn play_round(
        &self,
        case: &Case,
        transcript: &Transcript,
        round_num: u32,
        progress: &dyn DiscussionProgress,
    ) -> Result<Vec<Turn>, DiscussionError> {
        let mut join_set = JoinSet::new();

        for (idx, agent) in self.agents.iter().enumerate() {
            let agent = Arc::clone(agent);
            let knowledge = Arc::clone(&self.knowledge);
            let case = case.clone();
            let transcript = transcript.clone();

            join_set.spawn(async move {
                let result = Self::play_turn(&agent, &knowledge, &case, &transcript).await;
                (idx, agent.id().clone(), result)
            });
        }

        let mut slots: Vec<Option<Turn>> = (0..self.agents.len()).map(|_| None).collect();
        let mut first_error: Option<DiscussionError> = None;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, role, Ok(turn))) => {
                    progress.on_turn_complete(round_num, &role, true);
                    self.log(
                        case,
                        "turn",
                        serde_json::json!({
                            "round": round_num,
                            "role": role.to_string(),
                            "confidence": turn.confidence,
                            "veto": turn.veto,
                        }),
                    );
                    slots[idx] = Some(turn);
                }
                Ok((_, role, Err(e))) => {
                    warn!(role = %role, "Turn failed: {}", e);
                    progress.on_turn_complete(round_num, &role, false);
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!("Turn task join error: {}", e);
                    first_error.get_or_insert(DiscussionError::Join(e.to_string()));
                }
            }
        }

        // A required seat failing fails the round — and the session
        if let Some(e) = first_error {
            return Err(e);
        }
        let mut turns: Vec<Turn> = slots.into_iter().flatten().collect();

        // The reviewer runs after all opinion seats, from round 2 on, and
        // annotates rather than opines
        if round_num >= 2 && let Some(reviewer) = &self.reviewer {
            let opinions: Vec<(String, String)> = turns
                .iter()
                .map(|t| (t.role.to_string(), t.opinion.clone()))
                .collect();
            let annotation = reviewer.review_round(transcript, &opinions).await?;
            progress.on_turn_complete(round_num, reviewer.id(), true);
            self.log(
                case,
                "turn",
                serde_json::json!({
                    "round": round_num,
                    "role": reviewer.id().to_string(),
                    "inconsistent": annotation.inconsistent,
                }),
            );
            turns.push(annotation);
        }

        Ok(turns)
    }

    /// One opinion seat's work: retrieve context, then produce the turn.
    async fn play_turn(
        agent: &AgentRole,
        knowledge: &KnowledgeStore,
        case: &Case,
        transcript: &Transcript,
    ) -> Result<Turn, DiscussionError> {
        let mut retrieved: Vec<KnowledgeEntry> = Vec::new();
        let profile = agent.profile();
        for partition in &profile.partitions {
            let entries = knowledge
                .query(
                    &case.as_prompt_text(),
                    RETRIEVAL_K,
                    *partition,
                    profile.requires_validated(),
                )
                .await?;
            retrieved.extend(entries);
        }

        let turn = agent.produce_opinion(case, transcript, &retrieved).await?;
        Ok(turn)
    }

    /// Route the session to the lead physician's single-decision override.
    async fn escalate(
        &self,
        case: &Case,
        transcript: Transcript,
        target: RoleId,
        progress: &dyn DiscussionProgress,
    ) -> SessionRecord {
        info!(case = %case.id(), target = %target, "Session escalated");

        let Some(agent) = self.agents.iter().find(|a| a.id() == &target) else {
            return self.conclude_aborted(
                case,
                transcript,
                DiscussionError::MissingEscalationTarget(target),
                progress,
            );
        };

        match agent.override_decision(case, &transcript).await {
            Ok(turn) => {
                self.log(
                    case,
                    "override",
                    serde_json::json!({
                        "role": target.to_string(),
                        "confidence": turn.confidence,
                    }),
                );
                self.conclude(
                    case,
                    SessionRecord::escalated(transcript, turn.opinion),
                    progress,
                )
            }
            Err(e) => self.conclude_aborted(case, transcript, e.into(), progress),
        }
    }

    fn conclude(
        &self,
        case: &Case,
        record: SessionRecord,
        progress: &dyn DiscussionProgress,
    ) -> SessionRecord {
        self.log(
            case,
            "session_concluded",
            serde_json::json!({
                "state": record.state.to_string(),
                "rounds": record.transcript.rounds().len(),
            }),
        );
        progress.on_session_end(record.state);
        record
    }

    fn conclude_aborted(
        &self,
        case: &Case,
        transcript: Transcript,
        error: DiscussionError,
        progress: &dyn DiscussionProgress,
    ) -> SessionRecord {
        warn!(case = %case.id(), "Session aborted: {}", error);
        self.conclude(
            case,
            SessionRecord::aborted(transcript, error.to_string()),
            progress,
        )
    }

    /// Seats participating in a given round (reviewer joins from round 2).
    fn round_seats(&self, round_num: u32) -> usize {
        let reviewer = usize::from(round_num >= 2 && self.reviewer.is_some());
        self.agents.len() + reviewer
    }

    fn log(&self, case: &Case, event_type: &str, payload: serde_json::Value) {
        self.logger
            .log(TranscriptEvent::new(event_type, case.id().clone(), payload));
    }

    /// The session's terminal state decides whether it feeds distillation.
    pub fn is_distillable(record: &SessionRecord) -> bool {
        record.state.is_distillable()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::partition_store::{PartitionStore, PersistError};
    use crate::ports::transcript_log::NoTranscriptLog;
    use crate::use_cases::distill::SelfEvolutionLoop;
    use async_trait::async_trait;
    use consilium_domain::core::role::{RoleKind, RoleProfile};
    use consilium_domain::knowledge::partition::Partition;
    use consilium_domain::session::state::SessionState;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;

    /// Scripted completion backend: canned responses queued per role, popped
    /// in order regardless of scheduling.
    struct PanelScript {
        responses: StdMutex<HashMap<String, VecDeque<Result<String, BackendError>>>>,
    }

    impl PanelScript {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(HashMap::new()),
            })
        }

        fn script(&self, role: &str, response: Result<String, BackendError>) {
            self.responses
                .lock()
                .unwrap()
                .entry(role.to_string())
                .or_default()
                .push_back(response);
        }

        fn opinion(&self, role: &str, choice: &str, confidence: f64) {
            self.script(
                role,
                Ok(format!(
                    r#"{{"choice": "{}", "reasoning": "clinical grounds", "confidence": {}}}"#,
                    choice, confidence
                )),
            );
        }
    }

    #[async_trait]
    impl CompletionBackend for PanelScript {
        async fn complete(
            &self,
            _prompt: &str,
            profile: &consilium_domain::core::role::RoleProfile,
            _timeout: std::time::Duration,
        ) -> Result<String, BackendError> {
            self.responses
                .lock()
                .unwrap()
                .get_mut(profile.id.as_str())
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| {
                    Err(BackendError::Api(format!(
                        "script exhausted for {}",
                        profile.id
                    )))
                })
        }
    }

    /// Maps the first word of a text to a fixed vector, so the tests control
    /// exactly which opinions agree.
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

    #[derive(Default)]
    struct MemoryStore {
        saved: StdMutex<HashMap<Partition, Vec<KnowledgeEntry>>>,
    }

    #[async_trait]
    impl PartitionStore for MemoryStore {
        async fn load_partition(
            &self,
            partition: Partition,
        ) -> Result<Vec<KnowledgeEntry>, PersistError> {
            Ok(self
                .saved
                .lock()
                .unwrap()
                .get(&partition)
                .cloned()
                .unwrap_or_default())
        }

        async fn save_partition(
            &self,
            partition: Partition,
            entries: &[KnowledgeEntry],
        ) -> Result<(), PersistError> {
            self.saved
                .lock()
                .unwrap()
                .insert(partition, entries.to_vec());
            Ok(())
        }
    }

    fn two_seat_config(max_rounds: u32) -> DiscussionConfig {
        DiscussionConfig {
            max_rounds,
            agreement_threshold: 0.8,
            agent_roles: vec![
                RoleProfile::new(RoleId::PrimaryCare, RoleKind::Panelist, "assess the case"),
                RoleProfile::new(RoleId::LeadPhysician, RoleKind::Panelist, "integrate opinions"),
            ],
            retry_limit: 1,
            ..Default::default()
        }
    }

    async fn build(
        config: DiscussionConfig,
        script: Arc<PanelScript>,
    ) -> (DiscussionManager, Arc<KnowledgeStore>) {
        let knowledge = Arc::new(
            KnowledgeStore::open(
                Arc::new(KeywordEmbedder),
                Arc::new(MemoryStore::default()),
                config.dedup_similarity_threshold,
                config.retry_limit,
            )
            .await
            .unwrap(),
        );

        let manager = DiscussionManager::new(
            config,
            script,
            Arc::new(KeywordEmbedder),
            Arc::clone(&knowledge),
            Arc::new(NoTranscriptLog),
        )
        .unwrap();

        (manager, knowledge)
    }

    fn lung_nodule_case() -> Case {
        Case::new("case-lung-1", "3cm lung nodule, spiculated margins")
    }

    // ==================== Scenario A: first-round convergence ====================

    #[tokio::test]
    async fn test_convergence_round_one_distills_two_entries() {
        let script = PanelScript::new();
        script.opinion("primary_care", "alpha refer to oncology", 0.8);
        script.opinion("lead_physician", "alpha biopsy then staging", 0.9);

        let (manager, knowledge) = build(two_seat_config(3), Arc::clone(&script)).await;
        let record = manager.run(lung_nodule_case()).await;

        assert_eq!(record.state, SessionState::Converged);
        assert_eq!(record.transcript.rounds().len(), 1);
        // Lead physician's turn text verbatim
        assert!(record.final_answer.as_deref().unwrap().starts_with("alpha biopsy"));

        // Converged final round satisfies the agreement threshold
        let verdict = record.transcript.rounds()[0].verdict.as_ref().unwrap();
        assert!(verdict.agreement >= 0.8);

        let evolution = SelfEvolutionLoop::new(Arc::clone(&knowledge));
        let ids = evolution.distill(&record).await.unwrap();
        assert_eq!(ids.len(), 2);

        assert_eq!(knowledge.live_entries(Partition::CorrectKb).await, 1);
        assert_eq!(knowledge.live_entries(Partition::ChainKb).await, 1);

        let correct = knowledge.entry(&ids[0]).await.unwrap();
        assert!(correct.status.is_validated());
        let chain = knowledge.entry(&ids[1]).await.unwrap();
        assert!(!chain.status.is_validated());
        assert!(!chain.status.is_retracted());
    }

    // ==================== Scenario B: safety veto escalates ====================

    #[tokio::test]
    async fn test_safety_veto_escalates_to_lead_physician() {
        let mut config = two_seat_config(3);
        config.agent_roles.push(RoleProfile::new(
            RoleId::SafetyEthics,
            RoleKind::Safety,
            "review for safety",
        ));

        let script = PanelScript::new();
        script.opinion("primary_care", "alpha aggressive resection", 0.8);
        script.opinion("lead_physician", "alpha aggressive resection", 0.9);
        script.script(
            "safety_ethics",
            Ok(r#"{"assessment": "patient cannot tolerate surgery", "approved": false}"#.to_string()),
        );
        // The override call consumes the lead physician's second response
        script.opinion("lead_physician", "alpha conservative management", 0.7);

        let (manager, knowledge) = build(config, Arc::clone(&script)).await;
        let record = manager.run(lung_nodule_case()).await;

        assert_eq!(record.state, SessionState::Escalated);
        assert!(
            record
                .final_answer
                .as_deref()
                .unwrap()
                .contains("conservative management")
        );

        let evolution = SelfEvolutionLoop::new(Arc::clone(&knowledge));
        let ids = evolution.distill(&record).await.unwrap();
        assert_eq!(ids.len(), 1);

        // Escalated answers are not auto-validated: reasoning chain only
        assert_eq!(knowledge.live_entries(Partition::CorrectKb).await, 0);
        assert_eq!(knowledge.live_entries(Partition::ChainKb).await, 1);
        assert!(!knowledge.entry(&ids[0]).await.unwrap().status.is_validated());
    }

    // ==================== Scenario C: deadlock after max rounds ====================

    #[tokio::test]
    async fn test_persistent_disagreement_deadlocks() {
        let script = PanelScript::new();
        for _ in 0..2 {
            script.opinion("primary_care", "alpha watchful waiting", 0.8);
            script.opinion("lead_physician", "beta immediate surgery", 0.9);
        }

        let (manager, knowledge) = build(two_seat_config(2), Arc::clone(&script)).await;
        let record = manager.run(lung_nodule_case()).await;

        assert_eq!(record.state, SessionState::Deadlocked);
        assert_eq!(record.transcript.rounds().len(), 2);
        assert!(record.final_answer.is_none());
        assert_eq!(record.reason.as_deref(), Some("no consensus reached"));

        // Round numbers are strictly increasing by 1 from 1
        let numbers: Vec<u32> = record.transcript.rounds().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2]);

        let evolution = SelfEvolutionLoop::new(Arc::clone(&knowledge));
        let ids = evolution.distill(&record).await.unwrap();
        assert!(ids.is_empty());
        assert_eq!(knowledge.live_entries(Partition::CorrectKb).await, 0);
        assert_eq!(knowledge.live_entries(Partition::ChainKb).await, 0);
    }

    // ==================== Scenario D: retry exhaustion aborts ====================

    #[tokio::test(start_paused = true)]
    async fn test_backend_timeouts_abort_session() {
        let script = PanelScript::new();
        // retry_limit 1 → two attempts, both time out
        script.script("primary_care", Err(BackendError::Timeout));
        script.script("primary_care", Err(BackendError::Timeout));
        script.opinion("lead_physician", "alpha fine", 0.9);

        let (manager, knowledge) = build(two_seat_config(3), Arc::clone(&script)).await;
        let record = manager.run(lung_nodule_case()).await;

        assert_eq!(record.state, SessionState::Aborted);
        assert_eq!(record.transcript.rounds().len(), 0);
        assert!(record.reason.as_deref().unwrap().contains("primary_care"));

        let evolution = SelfEvolutionLoop::new(Arc::clone(&knowledge));
        assert!(evolution.distill(&record).await.unwrap().is_empty());
    }

    // ==================== Escalation policy on divergence ====================

    #[tokio::test]
    async fn test_escalate_after_routes_to_override_instead_of_deadlock() {
        let mut config = two_seat_config(2);
        config.escalate_after = Some(1);

        let script = PanelScript::new();
        script.opinion("primary_care", "alpha watchful waiting", 0.8);
        script.opinion("lead_physician", "beta immediate surgery", 0.9);
        script.opinion("lead_physician", "beta surgery after cardiology clearance", 0.85);

        let (manager, _) = build(config, Arc::clone(&script)).await;
        let record = manager.run(lung_nodule_case()).await;

        assert_eq!(record.state, SessionState::Escalated);
        assert!(
            record
                .final_answer
                .as_deref()
                .unwrap()
                .contains("cardiology clearance")
        );
        assert_eq!(record.transcript.rounds().len(), 1);
    }

    // ==================== Reviewer annotation forces divergence ====================

    #[tokio::test]
    async fn test_inconsistency_flag_blocks_round_two_convergence() {
        let mut config = two_seat_config(3);
        config.agent_roles.push(RoleProfile::new(
            RoleId::CotReviewer,
            RoleKind::Reviewer,
            "check consistency",
        ));

        let script = PanelScript::new();
        // Round 1 diverges
        script.opinion("primary_care", "alpha a", 0.8);
        script.opinion("lead_physician", "beta b", 0.9);
        // Round 2 agrees, but the reviewer flags it
        script.opinion("primary_care", "alpha agreed plan", 0.8);
        script.opinion("lead_physician", "alpha agreed plan", 0.9);
        script.script(
            "cot_reviewer",
            Ok(r#"{"consistent": false, "note": "plan contradicts round 1 labs"}"#.to_string()),
        );
        // Round 3 agrees and the reviewer accepts
        script.opinion("primary_care", "alpha agreed plan", 0.8);
        script.opinion("lead_physician", "alpha agreed plan", 0.9);
        script.script(
            "cot_reviewer",
            Ok(r#"{"consistent": true, "note": "coherent"}"#.to_string()),
        );

        let (manager, _) = build(config, Arc::clone(&script)).await;
        let record = manager.run(lung_nodule_case()).await;

        assert_eq!(record.state, SessionState::Converged);
        // The flagged round 2 did not converge; round 3 did
        assert_eq!(record.transcript.rounds().len(), 3);
        // Reviewer sat out round 1
        assert_eq!(record.transcript.rounds()[0].turns.len(), 2);
        assert_eq!(record.transcript.rounds()[1].turns.len(), 3);
        assert!(record.transcript.rounds()[1].has_inconsistency());
    }

    // ==================== Cancellation at round boundary ====================

    #[tokio::test]
    async fn test_cancellation_aborts_before_next_round() {
        let script = PanelScript::new();
        let (manager, knowledge) = build(two_seat_config(3), Arc::clone(&script)).await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let record = manager
            .run_with_progress(lung_nodule_case(), &NoProgress, &cancel)
            .await;

        assert_eq!(record.state, SessionState::Aborted);
        assert_eq!(record.transcript.rounds().len(), 0);
        assert!(record.reason.as_deref().unwrap().contains("cancelled"));
        assert_eq!(knowledge.live_entries(Partition::ChainKb).await, 0);
    }

    // ==================== Configuration gate ====================

    #[tokio::test]
    async fn test_empty_panel_fails_at_construction() {
        let config = DiscussionConfig {
            agent_roles: vec![],
            ..Default::default()
        };
        let knowledge = Arc::new(
            KnowledgeStore::open(
                Arc::new(KeywordEmbedder),
                Arc::new(MemoryStore::default()),
                0.92,
                0,
            )
            .await
            .unwrap(),
        );

        let result = DiscussionManager::new(
            config,
            PanelScript::new(),
            Arc::new(KeywordEmbedder),
            knowledge,
            Arc::new(NoTranscriptLog),
        );
        assert!(matches!(result, Err(ConfigError::NoRoles)));
    }
}
