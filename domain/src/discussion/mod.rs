//! Discussion records: turns, rounds, and the session transcript.

pub mod parsing;
pub mod round;
pub mod transcript;
pub mod turn;

pub use round::Round;
pub use transcript::Transcript;
pub use turn::Turn;

/// Get current timestamp in milliseconds since the Unix epoch
pub(crate) fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
