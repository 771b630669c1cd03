//! Transcript logging port
//!
//! Append-only session event log. Implementations must never fail the
//! session: logging errors are swallowed (and at most warned about) by the
//! adapter.

use consilium_domain::core::case::CaseId;

/// An event in the append-only session log
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    /// Event type tag, e.g. "round_started", "turn", "verdict"
    pub event_type: String,
    /// The case this event belongs to
    pub case_id: CaseId,
    /// Arbitrary JSON payload
    pub payload: serde_json::Value,
}

impl TranscriptEvent {
    pub fn new(
        event_type: impl Into<String>,
        case_id: CaseId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            case_id,
            payload,
        }
    }
}

/// Append-only transcript logger
pub trait TranscriptLogger: Send + Sync {
    fn log(&self, event: TranscriptEvent);
}

/// No-op logger for tests and embedded use
pub struct NoTranscriptLog;

impl TranscriptLogger for NoTranscriptLog {
    fn log(&self, _event: TranscriptEvent) {}
}
