//! Knowledge partitions.

use serde::{Deserialize, Serialize};

/// Named partition of the knowledge store
///
/// Two partitions, mirroring the split between what the panel got right and
/// how it got there:
/// - `CorrectKb` holds validated final answers;
/// - `ChainKb` holds reasoning-chain summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    CorrectKb,
    ChainKb,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::CorrectKb => "correct_kb",
            Partition::ChainKb => "chain_kb",
        }
    }

    pub fn all() -> [Partition; 2] {
        [Partition::CorrectKb, Partition::ChainKb]
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correct_kb" => Ok(Partition::CorrectKb),
            "chain_kb" => Ok(Partition::ChainKb),
            other => Err(format!("Unknown partition: {}", other)),
        }
    }
}
