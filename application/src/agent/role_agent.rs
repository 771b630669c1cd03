//! AgentRole: turns a case plus context into a panel turn.
//!
//! Every seat on the panel shares the same contract — `produce_opinion` —
//! and differs only in its immutable [`RoleProfile`]: instructions, role
//! kind, and which knowledge partitions it retrieves from. The discussion
//! loop never branches on a role's name.

use crate::ports::completion::{BackendError, CompletionBackend};
use consilium_domain::core::case::Case;
use consilium_domain::core::role::{RoleId, RoleKind, RoleProfile};
use consilium_domain::discussion::parsing::{
    parse_consistency_response, parse_opinion_response, parse_safety_response,
};
use consilium_domain::discussion::transcript::Transcript;
use consilium_domain::discussion::turn::Turn;
use consilium_domain::knowledge::entry::KnowledgeEntry;
use consilium_domain::prompt::template::PromptTemplate;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Fatal generation failure: the backend errored or produced empty content
/// after the retry budget was exhausted. Aborts the owning session.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Role {role}: backend call failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        role: RoleId,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("Role {role}: backend returned empty content after {attempts} attempts")]
    EmptyResponse { role: RoleId, attempts: u32 },
}

/// A reasoning unit bound to one role profile
///
/// Stateless with respect to the engine's own state: its only side effect is
/// invoking the completion backend.
pub struct AgentRole {
    profile: RoleProfile,
    backend: Arc<dyn CompletionBackend>,
    retry_limit: u32,
    call_timeout: Duration,
}

impl AgentRole {
    pub fn new(
        profile: RoleProfile,
        backend: Arc<dyn CompletionBackend>,
        retry_limit: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            profile,
            backend,
            retry_limit,
            call_timeout,
        }
    }

    pub fn profile(&self) -> &RoleProfile {
        &self.profile
    }

    pub fn id(&self) -> &RoleId {
        &self.profile.id
    }

    /// Produce this role's turn for the round being played.
    ///
    /// The prompt sees the case, the transcript of prior rounds, and the
    /// knowledge retrieved for this role — never another turn from the same
    /// round.
    pub async fn produce_opinion(
        &self,
        case: &Case,
        transcript_so_far: &Transcript,
        retrieved_knowledge: &[KnowledgeEntry],
    ) -> Result<Turn, GenerationError> {
        let round = transcript_so_far.next_round_number();
        let prompt = match self.profile.kind {
            RoleKind::Safety => PromptTemplate::safety_prompt(case, transcript_so_far),
            _ => PromptTemplate::opinion_prompt(case, transcript_so_far, retrieved_knowledge),
        };

        let response = self.call_backend(&prompt).await?;
        debug!(role = %self.profile.id, round, bytes = response.len(), "Role responded");

        Ok(match self.profile.kind {
            RoleKind::Safety => {
                let (assessment, approved) = parse_safety_response(&response);
                let turn = Turn::new(self.profile.id.clone(), round, assessment);
                if approved { turn } else { turn.with_veto() }
            }
            _ => {
                let (opinion, confidence) = parse_opinion_response(&response);
                Turn::new(self.profile.id.clone(), round, opinion).with_confidence(confidence)
            }
        })
    }

    /// Annotate a completed round with a consistency flag (reviewer seats).
    ///
    /// Runs after all opinion-producing roles of the round; the annotation
    /// may force the round to diverge but never replaces an opinion.
    pub async fn review_round(
        &self,
        transcript_so_far: &Transcript,
        current_opinions: &[(String, String)],
    ) -> Result<Turn, GenerationError> {
        let round = transcript_so_far.next_round_number();
        let prompt = PromptTemplate::consistency_prompt(transcript_so_far, current_opinions);

        let response = self.call_backend(&prompt).await?;
        let (note, consistent) = parse_consistency_response(&response);

        let turn = Turn::new(self.profile.id.clone(), round, note);
        Ok(if consistent {
            turn
        } else {
            turn.with_inconsistency()
        })
    }

    /// Single-decision override on escalation (lead physician).
    pub async fn override_decision(
        &self,
        case: &Case,
        transcript: &Transcript,
    ) -> Result<Turn, GenerationError> {
        let prompt = PromptTemplate::override_prompt(case, transcript);
        let response = self.call_backend(&prompt).await?;

        let (opinion, confidence) = parse_opinion_response(&response);
        // The override is appended conceptually after the last played round
        let round = transcript.rounds().last().map(|r| r.number).unwrap_or(1);
        Ok(Turn::new(self.profile.id.clone(), round, opinion).with_confidence(confidence))
    }

    /// One backend call with the retry budget applied. Empty content counts
    /// as a retryable failure — the model may answer on the next attempt.
    async fn call_backend(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0u32;
        loop {
            let outcome = self
                .backend
                .complete(prompt, &self.profile, self.call_timeout)
                .await;

            let retryable_failure = match outcome {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => None, // empty completion
                Err(e) if e.is_retryable() => Some(e),
                Err(source) => {
                    return Err(GenerationError::RetriesExhausted {
                        role: self.profile.id.clone(),
                        attempts: attempt + 1,
                        source,
                    });
                }
            };

            if attempt >= self.retry_limit {
                return Err(match retryable_failure {
                    Some(source) => GenerationError::RetriesExhausted {
                        role: self.profile.id.clone(),
                        attempts: attempt + 1,
                        source,
                    },
                    None => GenerationError::EmptyResponse {
                        role: self.profile.id.clone(),
                        attempts: attempt + 1,
                    },
                });
            }

            let delay = crate::agent::retry::backoff_delay(attempt);
            debug!(
                role = %self.profile.id,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Retrying backend call"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted backend: pops one canned result per call.
    struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<String, BackendError>>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<String, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            _prompt: &str,
            _profile: &RoleProfile,
            _timeout: Duration,
        ) -> Result<String, BackendError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::Api("script exhausted".to_string())))
        }
    }

    fn panelist(backend: Arc<dyn CompletionBackend>, retry_limit: u32) -> AgentRole {
        AgentRole::new(
            RoleProfile::new(RoleId::PrimaryCare, RoleKind::Panelist, "assess"),
            backend,
            retry_limit,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_opinion_turn_from_json_response() {
        let backend = ScriptedBackend::new(vec![Ok(
            r#"{"choice": "MRI", "reasoning": "rule out mass", "confidence": 0.7}"#.to_string(),
        )]);
        let agent = panelist(backend, 0);
        let case = Case::new("c-1", "chronic headache");

        let turn = agent
            .produce_opinion(&case, &Transcript::new("c-1"), &[])
            .await
            .unwrap();

        assert_eq!(turn.role, RoleId::PrimaryCare);
        assert_eq!(turn.round, 1);
        assert!(turn.opinion.contains("MRI"));
        assert_eq!(turn.confidence, 0.7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failure_then_success() {
        let backend = ScriptedBackend::new(vec![
            Err(BackendError::Timeout),
            Ok(r#"{"choice": "observe", "confidence": 0.6}"#.to_string()),
        ]);
        let agent = panelist(backend, 2);
        let case = Case::new("c-1", "x");

        let turn = agent
            .produce_opinion(&case, &Transcript::new("c-1"), &[])
            .await
            .unwrap();
        assert!(turn.opinion.contains("observe"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhaustion_is_fatal() {
        let backend = ScriptedBackend::new(vec![
            Err(BackendError::Timeout),
            Err(BackendError::Timeout),
            Err(BackendError::Timeout),
        ]);
        let agent = panelist(backend, 2);
        let case = Case::new("c-1", "x");

        let err = agent
            .produce_opinion(&case, &Transcript::new("c-1"), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::RetriesExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_responses_exhaust_to_empty_error() {
        let backend =
            ScriptedBackend::new(vec![Ok("".to_string()), Ok("   ".to_string())]);
        let agent = panelist(backend, 1);
        let case = Case::new("c-1", "x");

        let err = agent
            .produce_opinion(&case, &Transcript::new("c-1"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_safety_role_parses_veto() {
        let backend = ScriptedBackend::new(vec![Ok(
            r#"{"assessment": "dosage unsafe", "approved": false}"#.to_string(),
        )]);
        let agent = AgentRole::new(
            RoleProfile::new(RoleId::SafetyEthics, RoleKind::Safety, "review"),
            backend,
            0,
            Duration::from_secs(5),
        );
        let case = Case::new("c-1", "x");

        let turn = agent
            .produce_opinion(&case, &Transcript::new("c-1"), &[])
            .await
            .unwrap();
        assert!(turn.veto);
        assert!(turn.opinion.contains("dosage unsafe"));
    }

    #[tokio::test]
    async fn test_reviewer_flags_inconsistency() {
        let backend = ScriptedBackend::new(vec![Ok(
            r#"{"consistent": false, "note": "round contradicts labs"}"#.to_string(),
        )]);
        let agent = AgentRole::new(
            RoleProfile::new(RoleId::CotReviewer, RoleKind::Reviewer, "check"),
            backend,
            0,
            Duration::from_secs(5),
        );

        let turn = agent
            .review_round(
                &Transcript::new("c-1"),
                &[("primary_care".to_string(), "op".to_string())],
            )
            .await
            .unwrap();
        assert!(turn.inconsistent);
    }
}
