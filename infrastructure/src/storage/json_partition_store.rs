//! JSON-file partition store.
//!
//! One JSON file per partition under a data directory. Saves are atomic:
//! written to a temporary sibling first, then renamed over the target, so a
//! crash mid-save never leaves a half-written partition behind.

use async_trait::async_trait;
use consilium_application::ports::partition_store::{PartitionStore, PersistError};
use consilium_domain::knowledge::{entry::KnowledgeEntry, partition::Partition};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Partition store writing `<data_dir>/<partition>.json`
pub struct JsonPartitionStore {
    data_dir: PathBuf,
}

impl JsonPartitionStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, partition: Partition) -> PathBuf {
        self.data_dir.join(format!("{}.json", partition))
    }
}

#[async_trait]
impl PartitionStore for JsonPartitionStore {
    async fn load_partition(
        &self,
        partition: Partition,
    ) -> Result<Vec<KnowledgeEntry>, PersistError> {
        let path = self.path_for(partition);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(partition = %partition, "No stored partition, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => return Err(PersistError::Load { partition, source }),
        };

        serde_json::from_slice(&bytes).map_err(|e| PersistError::Corrupt {
            partition,
            detail: e.to_string(),
        })
    }

    async fn save_partition(
        &self,
        partition: Partition,
        entries: &[KnowledgeEntry],
    ) -> Result<(), PersistError> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| PersistError::Save { partition, source })?;

        let bytes = serde_json::to_vec_pretty(entries).map_err(|e| PersistError::Corrupt {
            partition,
            detail: e.to_string(),
        })?;

        let path = self.path_for(partition);
        let tmp = self.data_dir.join(format!(".{}.json.tmp", partition));

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| PersistError::Save { partition, source })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| PersistError::Save { partition, source })?;

        debug!(partition = %partition, entries = entries.len(), "Saved partition");
        Ok(())
    }
}
