//! Role identity and profile value objects
//!
//! A [`RoleId`] names a seat on the consultation panel; a [`RoleProfile`] is
//! the immutable behavioral description of that seat: its instructions, what
//! kind of contribution it makes, and which knowledge partitions it may
//! retrieve from. New roles are added by registering a profile — the
//! discussion loop never branches on a role's name.

use crate::knowledge::partition::Partition;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identity of a panel role (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleId {
    PrimaryCare,
    LeadPhysician,
    SafetyEthics,
    CotReviewer,
    /// A named specialist seat, e.g. "cardiology"
    Specialist(String),
}

impl RoleId {
    /// Get the string identifier for this role
    pub fn as_str(&self) -> &str {
        match self {
            RoleId::PrimaryCare => "primary_care",
            RoleId::LeadPhysician => "lead_physician",
            RoleId::SafetyEthics => "safety_ethics",
            RoleId::CotReviewer => "cot_reviewer",
            RoleId::Specialist(s) => s,
        }
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RoleId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "primary_care" => RoleId::PrimaryCare,
            "lead_physician" => RoleId::LeadPhysician,
            "safety_ethics" => RoleId::SafetyEthics,
            "cot_reviewer" => RoleId::CotReviewer,
            other => RoleId::Specialist(other.to_string()),
        })
    }
}

impl Serialize for RoleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().expect("RoleId parse is infallible"))
    }
}

/// The kind of contribution a role makes to a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// Produces a clinical opinion that counts toward consensus
    Panelist,
    /// Produces a safety/ethics assessment and may veto
    Safety,
    /// Annotates the round with a consistency flag; never opines
    Reviewer,
}

/// Immutable behavioral profile of a panel seat (Value Object)
///
/// # Example
///
/// ```
/// use consilium_domain::core::role::{RoleId, RoleKind, RoleProfile};
/// use consilium_domain::knowledge::partition::Partition;
///
/// let profile = RoleProfile::new(
///     RoleId::SafetyEthics,
///     RoleKind::Safety,
///     "Review the panel's recommendation for safety risks and ethical issues.",
/// )
/// .with_partition(Partition::CorrectKb)
/// .validated_only();
///
/// assert!(profile.requires_validated());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProfile {
    /// The seat this profile describes
    pub id: RoleId,
    /// What kind of contribution this role makes
    pub kind: RoleKind,
    /// Free-text instructions injected as the role's system prompt
    pub instructions: String,
    /// Knowledge partitions this role retrieves context from
    #[serde(default)]
    pub partitions: Vec<Partition>,
    /// Restrict retrieval to validated entries
    #[serde(default)]
    pub validated_only: bool,
}

impl RoleProfile {
    pub fn new(id: RoleId, kind: RoleKind, instructions: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            instructions: instructions.into(),
            partitions: Vec::new(),
            validated_only: false,
        }
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partitions.push(partition);
        self
    }

    pub fn validated_only(mut self) -> Self {
        self.validated_only = true;
        self
    }

    /// Whether this role's turns enter the consensus similarity matrix
    pub fn counts_toward_consensus(&self) -> bool {
        self.kind == RoleKind::Panelist
    }

    pub fn requires_validated(&self) -> bool {
        self.validated_only
    }

    /// The default five-seat panel mirroring a hospital MDT consultation.
    pub fn default_panel() -> Vec<RoleProfile> {
        vec![
            RoleProfile::new(
                RoleId::PrimaryCare,
                RoleKind::Panelist,
                "You are a primary care physician. Give an initial assessment \
                 and working diagnosis for the case.",
            )
            .with_partition(Partition::CorrectKb)
            .with_partition(Partition::ChainKb),
            RoleProfile::new(
                RoleId::Specialist("specialist".to_string()),
                RoleKind::Panelist,
                "You are the consulting specialist most relevant to this case. \
                 Give a focused specialist opinion.",
            )
            .with_partition(Partition::CorrectKb)
            .with_partition(Partition::ChainKb),
            RoleProfile::new(
                RoleId::LeadPhysician,
                RoleKind::Panelist,
                "You are the lead physician. Integrate the panel's reasoning so \
                 far into a single clinical recommendation.",
            )
            .with_partition(Partition::CorrectKb),
            RoleProfile::new(
                RoleId::SafetyEthics,
                RoleKind::Safety,
                "You are the safety and ethics reviewer. Evaluate the panel's \
                 current recommendation for safety risks, ethical issues and \
                 bias. Veto only for non-negotiable concerns.",
            )
            .with_partition(Partition::CorrectKb)
            .validated_only(),
            RoleProfile::new(
                RoleId::CotReviewer,
                RoleKind::Reviewer,
                "You are the chain-of-thought reviewer. Check the round's \
                 reasoning for internal consistency. Flag contradictions.",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_id_roundtrip() {
        for id in [
            RoleId::PrimaryCare,
            RoleId::LeadPhysician,
            RoleId::SafetyEthics,
            RoleId::CotReviewer,
            RoleId::Specialist("cardiology".to_string()),
        ] {
            let parsed: RoleId = id.as_str().parse().unwrap();
            assert_eq!(id, parsed);
        }
    }

    #[test]
    fn test_specialist_parse() {
        let id: RoleId = "nephrology".parse().unwrap();
        assert_eq!(id, RoleId::Specialist("nephrology".to_string()));
        assert_eq!(id.to_string(), "nephrology");
    }

    #[test]
    fn test_default_panel_shape() {
        let panel = RoleProfile::default_panel();
        assert_eq!(panel.len(), 5);
        assert_eq!(
            panel.iter().filter(|p| p.kind == RoleKind::Safety).count(),
            1
        );
        assert_eq!(
            panel.iter().filter(|p| p.kind == RoleKind::Reviewer).count(),
            1
        );
        // The reviewer neither opines nor retrieves
        let reviewer = panel.iter().find(|p| p.id == RoleId::CotReviewer).unwrap();
        assert!(!reviewer.counts_toward_consensus());
        assert!(reviewer.partitions.is_empty());
    }

    #[test]
    fn test_safety_profile_retrieves_validated_only() {
        let panel = RoleProfile::default_panel();
        let safety = panel.iter().find(|p| p.id == RoleId::SafetyEthics).unwrap();
        assert!(safety.requires_validated());
    }
}
