//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No roles configured for the panel")]
    NoRoles,

    #[error("Round {got} does not follow round {expected} in the transcript")]
    NonContiguousRound { expected: u32, got: u32 },

    #[error("Embedding dimension mismatch: store uses {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Invalid case: {0}")]
    InvalidCase(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::NoRoles.is_cancelled());
        assert!(
            !DomainError::NonContiguousRound {
                expected: 2,
                got: 4
            }
            .is_cancelled()
        );
    }
}
