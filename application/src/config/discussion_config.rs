//! Discussion configuration.
//!
//! [`DiscussionConfig`] is the validated runtime configuration of the
//! engine. Infrastructure deserializes a file config and converts it into
//! this type; [`DiscussionConfig::validate`] is the single gate — an invalid
//! configuration fails at startup and no session is ever created from it.

use consilium_domain::core::role::{RoleKind, RoleProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors, fatal at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("max_rounds must be at least 1, got {0}")]
    InvalidMaxRounds(u32),

    #[error("{name} must be within 0.0–1.0, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("escalate_after ({escalate_after}) must not exceed max_rounds ({max_rounds})")]
    EscalateAfterOutOfRange {
        escalate_after: u32,
        max_rounds: u32,
    },

    #[error("At least one agent role must be configured")]
    NoRoles,

    #[error("Duplicate role configured: {0}")]
    DuplicateRole(String),

    #[error("At most one {0} role may be configured")]
    DuplicateSingletonKind(&'static str),

    #[error("embedding_model must not be empty")]
    EmptyEmbeddingModel,

    #[error("Role {role}: invalid {field} value '{value}'")]
    InvalidRoleField {
        role: String,
        field: &'static str,
        value: String,
    },
}

/// Validated engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionConfig {
    /// Maximum number of discussion rounds (≥1)
    pub max_rounds: u32,
    /// Minimum pairwise opinion similarity for convergence (0–1)
    pub agreement_threshold: f64,
    /// Round at which a diverging verdict escalates to the lead physician
    /// instead of another round; `None` disables escalation-on-divergence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalate_after: Option<u32>,
    /// Similarity at which a new knowledge entry reinforces an existing one (0–1)
    pub dedup_similarity_threshold: f64,
    /// Identifier of the embedding model the knowledge store is built on
    pub embedding_model: String,
    /// Ordered panel: turn order within a round and transcript order
    pub agent_roles: Vec<RoleProfile>,
    /// Retries per backend call on retryable failures (≥0)
    pub retry_limit: u32,
    /// Per-attempt deadline for backend calls, in seconds
    pub call_timeout_seconds: u64,
    /// Retract provisional entries unused for this many days; `None` disables pruning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prune_after_days: Option<u32>,
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            max_rounds: 4,
            agreement_threshold: 0.82,
            escalate_after: None,
            dedup_similarity_threshold: 0.92,
            embedding_model: "text-embedding-3-small".to_string(),
            agent_roles: RoleProfile::default_panel(),
            retry_limit: 3,
            call_timeout_seconds: 30,
            prune_after_days: None,
        }
    }
}

impl DiscussionConfig {
    /// Per-attempt call timeout as a [`Duration`]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }

    /// Roles that produce opinions or assessments (everything but reviewers)
    pub fn opinion_roles(&self) -> impl Iterator<Item = &RoleProfile> {
        self.agent_roles
            .iter()
            .filter(|r| r.kind != RoleKind::Reviewer)
    }

    /// The consistency reviewer seat, when configured
    pub fn reviewer_role(&self) -> Option<&RoleProfile> {
        self.agent_roles
            .iter()
            .find(|r| r.kind == RoleKind::Reviewer)
    }

    /// Check the configuration for inconsistencies.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds < 1 {
            return Err(ConfigError::InvalidMaxRounds(self.max_rounds));
        }

        for (name, value) in [
            ("agreement_threshold", self.agreement_threshold),
            (
                "dedup_similarity_threshold",
                self.dedup_similarity_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }

        if let Some(escalate_after) = self.escalate_after
            && escalate_after > self.max_rounds
        {
            return Err(ConfigError::EscalateAfterOutOfRange {
                escalate_after,
                max_rounds: self.max_rounds,
            });
        }

        if self.agent_roles.is_empty() {
            return Err(ConfigError::NoRoles);
        }

        let mut seen = HashSet::new();
        for role in &self.agent_roles {
            if !seen.insert(role.id.as_str().to_string()) {
                return Err(ConfigError::DuplicateRole(role.id.to_string()));
            }
        }

        for (kind, label) in [(RoleKind::Safety, "safety"), (RoleKind::Reviewer, "reviewer")] {
            if self.agent_roles.iter().filter(|r| r.kind == kind).count() > 1 {
                return Err(ConfigError::DuplicateSingletonKind(label));
            }
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::EmptyEmbeddingModel);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consilium_domain::core::role::{RoleId, RoleKind};

    #[test]
    fn test_default_config_is_valid() {
        assert!(DiscussionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let config = DiscussionConfig {
            max_rounds: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxRounds(0))
        ));
    }

    #[test]
    fn test_threshold_range_enforced() {
        let config = DiscussionConfig {
            agreement_threshold: 1.4,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange { .. })
        ));
    }

    #[test]
    fn test_escalate_after_bounded_by_max_rounds() {
        let config = DiscussionConfig {
            max_rounds: 3,
            escalate_after: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EscalateAfterOutOfRange { .. })
        ));

        let config = DiscussionConfig {
            max_rounds: 3,
            escalate_after: Some(3),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_panel_rejected() {
        let config = DiscussionConfig {
            agent_roles: vec![],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoRoles)));
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let mut config = DiscussionConfig::default();
        config.agent_roles.push(RoleProfile::new(
            RoleId::PrimaryCare,
            RoleKind::Panelist,
            "again",
        ));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateRole(_))
        ));
    }

    #[test]
    fn test_two_safety_roles_rejected() {
        let mut config = DiscussionConfig::default();
        config.agent_roles.push(RoleProfile::new(
            RoleId::Specialist("second_safety".to_string()),
            RoleKind::Safety,
            "another safety seat",
        ));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSingletonKind("safety"))
        ));
    }

    #[test]
    fn test_opinion_roles_exclude_reviewer() {
        let config = DiscussionConfig::default();
        assert!(
            config
                .opinion_roles()
                .all(|r| r.kind != RoleKind::Reviewer)
        );
        assert!(config.reviewer_role().is_some());
    }
}
