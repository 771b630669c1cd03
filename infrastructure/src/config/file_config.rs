//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the config file and are
//! deserialized directly. [`FileConfig::to_discussion_config`] converts them
//! into the application layer's validated [`DiscussionConfig`].
//!
//! Example configuration:
//!
//! ```toml
//! [discussion]
//! max_rounds = 4
//! agreement_threshold = 0.82
//! escalate_after = 3
//!
//! [[discussion.roles]]
//! id = "primary_care"
//! kind = "panelist"
//! instructions = "You are a primary care physician..."
//! partitions = ["correct_kb", "chain_kb"]
//!
//! [backend]
//! base_url = "https://api.deepseek.com"
//! model = "deepseek-chat"
//! api_key_env = "CONSILIUM_API_KEY"
//!
//! [embedding]
//! model = "text-embedding-3-small"
//!
//! [storage]
//! data_dir = "knowledge"
//! transcript_dir = "transcripts"
//! ```

use consilium_application::config::discussion_config::{ConfigError, DiscussionConfig};
use consilium_domain::core::role::{RoleId, RoleKind, RoleProfile};
use consilium_domain::knowledge::partition::Partition;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Discussion engine settings
    pub discussion: FileDiscussionConfig,
    /// Completion backend settings
    pub backend: FileBackendConfig,
    /// Embedding backend settings
    pub embedding: FileEmbeddingConfig,
    /// Storage locations
    pub storage: FileStorageConfig,
}

/// `[discussion]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDiscussionConfig {
    pub max_rounds: u32,
    pub agreement_threshold: f64,
    pub escalate_after: Option<u32>,
    pub dedup_similarity_threshold: f64,
    pub retry_limit: u32,
    pub call_timeout_seconds: u64,
    pub prune_after_days: Option<u32>,
    /// Ordered panel; empty means the default five-seat panel
    pub roles: Vec<FileRoleConfig>,
}

impl Default for FileDiscussionConfig {
    fn default() -> Self {
        let defaults = DiscussionConfig::default();
        Self {
            max_rounds: defaults.max_rounds,
            agreement_threshold: defaults.agreement_threshold,
            escalate_after: None,
            dedup_similarity_threshold: defaults.dedup_similarity_threshold,
            retry_limit: defaults.retry_limit,
            call_timeout_seconds: defaults.call_timeout_seconds,
            prune_after_days: None,
            roles: Vec::new(),
        }
    }
}

/// `[[discussion.roles]]` entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoleConfig {
    pub id: String,
    /// "panelist", "safety" or "reviewer"
    pub kind: String,
    pub instructions: String,
    /// Partition names: "correct_kb", "chain_kb"
    pub partitions: Vec<String>,
    pub validated_only: bool,
}

impl Default for FileRoleConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: "panelist".to_string(),
            instructions: String::new(),
            partitions: Vec::new(),
            validated_only: false,
        }
    }
}

/// `[backend]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable carrying the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "CONSILIUM_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// `[embedding]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEmbeddingConfig {
    /// Embedding endpoint; falls back to the completion backend's base URL
    pub base_url: Option<String>,
    pub model: String,
}

impl Default for FileEmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: DiscussionConfig::default().embedding_model,
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    pub data_dir: String,
    pub transcript_dir: String,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "knowledge".to_string(),
            transcript_dir: "transcripts".to_string(),
        }
    }
}

impl FileConfig {
    /// Convert into the application layer's validated configuration.
    ///
    /// The conversion itself also validates: unknown role kinds or partition
    /// names fail here rather than surfacing mid-session.
    pub fn to_discussion_config(&self) -> Result<DiscussionConfig, ConfigError> {
        let agent_roles = if self.discussion.roles.is_empty() {
            RoleProfile::default_panel()
        } else {
            self.discussion
                .roles
                .iter()
                .map(FileRoleConfig::to_profile)
                .collect::<Result<Vec<_>, _>>()?
        };

        let config = DiscussionConfig {
            max_rounds: self.discussion.max_rounds,
            agreement_threshold: self.discussion.agreement_threshold,
            escalate_after: self.discussion.escalate_after,
            dedup_similarity_threshold: self.discussion.dedup_similarity_threshold,
            embedding_model: self.embedding.model.clone(),
            agent_roles,
            retry_limit: self.discussion.retry_limit,
            call_timeout_seconds: self.discussion.call_timeout_seconds,
            prune_after_days: self.discussion.prune_after_days,
        };
        config.validate()?;
        Ok(config)
    }

    /// The embedding endpoint, defaulting to the completion backend's.
    pub fn embedding_base_url(&self) -> &str {
        self.embedding
            .base_url
            .as_deref()
            .unwrap_or(&self.backend.base_url)
    }
}

impl FileRoleConfig {
    fn to_profile(&self) -> Result<RoleProfile, ConfigError> {
        let kind = match self.kind.to_lowercase().as_str() {
            "panelist" => RoleKind::Panelist,
            "safety" => RoleKind::Safety,
            "reviewer" => RoleKind::Reviewer,
            other => {
                return Err(ConfigError::InvalidRoleField {
                    role: self.id.clone(),
                    field: "kind",
                    value: other.to_string(),
                });
            }
        };

        let id: RoleId = self
            .id
            .parse()
            .expect("RoleId parse is infallible");

        let mut profile = RoleProfile::new(id, kind, self.instructions.clone());
        for name in &self.partitions {
            let partition: Partition =
                name.parse().map_err(|_| ConfigError::InvalidRoleField {
                    role: self.id.clone(),
                    field: "partitions",
                    value: name.clone(),
                })?;
            profile = profile.with_partition(partition);
        }
        if self.validated_only {
            profile = profile.validated_only();
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_config_converts() {
        let config = FileConfig::default().to_discussion_config().unwrap();
        assert_eq!(config.max_rounds, 4);
        assert_eq!(config.agent_roles.len(), 5);
    }

    #[test]
    fn test_roles_from_toml() {
        let toml = r#"
[discussion]
max_rounds = 2
agreement_threshold = 0.8

[[discussion.roles]]
id = "primary_care"
kind = "panelist"
instructions = "assess"
partitions = ["correct_kb"]

[[discussion.roles]]
id = "safety_ethics"
kind = "safety"
instructions = "review"
validated_only = true
"#;
        let file: FileConfig = toml::from_str(toml).unwrap();
        let config = file.to_discussion_config().unwrap();

        assert_eq!(config.max_rounds, 2);
        assert_eq!(config.agent_roles.len(), 2);
        assert_eq!(config.agent_roles[0].id, RoleId::PrimaryCare);
        assert_eq!(config.agent_roles[0].partitions, vec![Partition::CorrectKb]);
        assert!(config.agent_roles[1].requires_validated());
    }

    #[test]
    fn test_unknown_role_kind_rejected() {
        let file = FileConfig {
            discussion: FileDiscussionConfig {
                roles: vec![FileRoleConfig {
                    id: "primary_care".to_string(),
                    kind: "chairman".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            file.to_discussion_config(),
            Err(ConfigError::InvalidRoleField { field: "kind", .. })
        ));
    }

    #[test]
    fn test_unknown_partition_rejected() {
        let file = FileConfig {
            discussion: FileDiscussionConfig {
                roles: vec![FileRoleConfig {
                    id: "primary_care".to_string(),
                    partitions: vec!["secret_kb".to_string()],
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            file.to_discussion_config(),
            Err(ConfigError::InvalidRoleField {
                field: "partitions",
                ..
            })
        ));
    }

    #[test]
    fn test_embedding_base_url_falls_back_to_backend() {
        let file = FileConfig::default();
        assert_eq!(file.embedding_base_url(), "https://api.openai.com");

        let file = FileConfig {
            embedding: FileEmbeddingConfig {
                base_url: Some("https://embed.example.com".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(file.embedding_base_url(), "https://embed.example.com");
    }
}
