//! Partition persistence port
//!
//! The knowledge store holds partitions in memory; durable storage is an
//! external concern behind this interface. Formats (JSON files, a database)
//! are infrastructure decisions.

use async_trait::async_trait;
use consilium_domain::knowledge::{entry::KnowledgeEntry, partition::Partition};
use thiserror::Error;

/// Errors from the persistence layer
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to read partition {partition}: {source}")]
    Load {
        partition: Partition,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write partition {partition}: {source}")]
    Save {
        partition: Partition,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt partition data in {partition}: {detail}")]
    Corrupt { partition: Partition, detail: String },
}

/// Durable storage for knowledge partitions
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Load all entries of a partition. A partition that was never saved
    /// loads as empty.
    async fn load_partition(&self, partition: Partition)
        -> Result<Vec<KnowledgeEntry>, PersistError>;

    /// Replace the durable contents of a partition.
    async fn save_partition(
        &self,
        partition: Partition,
        entries: &[KnowledgeEntry],
    ) -> Result<(), PersistError>;
}
