//! Session outcome record.

use crate::core::case::CaseId;
use crate::discussion::transcript::Transcript;
use crate::knowledge::entry::EntryId;
use crate::session::state::SessionState;
use serde::{Deserialize, Serialize};

/// The outcome of a concluded session, consumed by the serving layer.
///
/// Aborted sessions carry the terminating error kind in `reason` along with
/// the partial transcript; deadlocked sessions carry "no consensus reached"
/// plus the full multi-round transcript for human adjudication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub case_id: CaseId,
    pub state: SessionState,
    /// Final answer text; `None` for deadlocked and aborted sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    /// Why the session ended without an answer, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub transcript: Transcript,
    /// Knowledge entries written by distillation, in write order
    #[serde(default)]
    pub entries_written: Vec<EntryId>,
}

impl SessionRecord {
    pub fn converged(transcript: Transcript, answer: impl Into<String>) -> Self {
        Self {
            case_id: transcript.case_id().clone(),
            state: SessionState::Converged,
            final_answer: Some(answer.into()),
            reason: None,
            transcript,
            entries_written: Vec::new(),
        }
    }

    pub fn escalated(transcript: Transcript, answer: impl Into<String>) -> Self {
        Self {
            case_id: transcript.case_id().clone(),
            state: SessionState::Escalated,
            final_answer: Some(answer.into()),
            reason: None,
            transcript,
            entries_written: Vec::new(),
        }
    }

    pub fn deadlocked(transcript: Transcript) -> Self {
        Self {
            case_id: transcript.case_id().clone(),
            state: SessionState::Deadlocked,
            final_answer: None,
            reason: Some("no consensus reached".to_string()),
            transcript,
            entries_written: Vec::new(),
        }
    }

    pub fn aborted(transcript: Transcript, reason: impl Into<String>) -> Self {
        Self {
            case_id: transcript.case_id().clone(),
            state: SessionState::Aborted,
            final_answer: None,
            reason: Some(reason.into()),
            transcript,
            entries_written: Vec::new(),
        }
    }

    pub fn with_entries(mut self, entries: Vec<EntryId>) -> Self {
        self.entries_written = entries;
        self
    }
}
