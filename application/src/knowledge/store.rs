//! Embedding-indexed knowledge store.
//!
//! One owned instance per process: opened at startup, hydrated from the
//! [`PartitionStore`] port, flushed at shutdown. All access goes through
//! `query` / `upsert` / `retract` — there is no ambient global state.
//!
//! Concurrency: queries take a shared read lock; every mutation serializes
//! on a single writer mutex, which is what makes the deduplication invariant
//! hold across concurrent sessions — two sessions cannot both insert
//! near-duplicate entries as separate validated facts.

use crate::agent::retry::with_retries;
use crate::ports::completion::BackendError;
use crate::ports::embedding::EmbeddingBackend;
use crate::ports::partition_store::{PartitionStore, PersistError};
use consilium_domain::consensus::similarity::cosine_similarity;
use consilium_domain::knowledge::entry::{
    EntryDraft, EntryId, KnowledgeEntry, ValidationStatus,
};
use consilium_domain::knowledge::partition::Partition;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Errors from knowledge store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] BackendError),

    #[error("Persistence failed: {0}")]
    Persist(#[from] PersistError),

    #[error("Embedding dimension mismatch: store uses {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

struct StoreState {
    partitions: HashMap<Partition, Vec<KnowledgeEntry>>,
    /// Dimensionality of the configured embedding model, fixed by the first
    /// vector seen (loaded or embedded)
    dimension: Option<usize>,
}

impl StoreState {
    fn check_dimension(&mut self, vector: &[f32]) -> Result<(), StoreError> {
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(StoreError::DimensionMismatch {
                expected,
                got: vector.len(),
            }),
            Some(_) => Ok(()),
            None => {
                self.dimension = Some(vector.len());
                Ok(())
            }
        }
    }
}

/// Shared, embedding-indexed repository of distilled knowledge
pub struct KnowledgeStore {
    embedder: Arc<dyn EmbeddingBackend>,
    storage: Arc<dyn PartitionStore>,
    dedup_threshold: f64,
    retry_limit: u32,
    state: RwLock<StoreState>,
    /// Serializes upsert/retract/commit across sessions
    write_lock: Mutex<()>,
    seq: AtomicU64,
}

impl KnowledgeStore {
    /// Open the store, hydrating every partition from durable storage.
    pub async fn open(
        embedder: Arc<dyn EmbeddingBackend>,
        storage: Arc<dyn PartitionStore>,
        dedup_threshold: f64,
        retry_limit: u32,
    ) -> Result<Self, StoreError> {
        let mut partitions = HashMap::new();
        let mut dimension = None;

        for partition in Partition::all() {
            let entries = storage.load_partition(partition).await?;
            for entry in &entries {
                match dimension {
                    None => dimension = Some(entry.embedding.len()),
                    Some(expected) if expected != entry.embedding.len() => {
                        return Err(StoreError::DimensionMismatch {
                            expected,
                            got: entry.embedding.len(),
                        });
                    }
                    Some(_) => {}
                }
            }
            info!(partition = %partition, entries = entries.len(), "Loaded knowledge partition");
            partitions.insert(partition, entries);
        }

        Ok(Self {
            embedder,
            storage,
            dedup_threshold,
            retry_limit,
            state: RwLock::new(StoreState {
                partitions,
                dimension,
            }),
            write_lock: Mutex::new(()),
            seq: AtomicU64::new(0),
        })
    }

    /// Nearest-neighbor retrieval by embedding similarity.
    ///
    /// Results are ordered by similarity descending, ties broken by
    /// most-recently-validated first. Retracted entries are never returned;
    /// `validated_only` additionally excludes provisional ones. An empty or
    /// short partition returns fewer than `k` entries — never an error.
    pub async fn query(
        &self,
        text: &str,
        k: usize,
        partition: Partition,
        validated_only: bool,
    ) -> Result<Vec<KnowledgeEntry>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        // Embed outside the lock: the backend call must not block writers
        let query_vec = self.embed(text).await?;

        let state = self.state.read().await;
        let entries = match state.partitions.get(&partition) {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Ok(Vec::new()),
        };

        let mut scored: Vec<(f64, &KnowledgeEntry)> = entries
            .iter()
            .filter(|e| e.retrievable(validated_only))
            .map(|e| (cosine_similarity(&query_vec, &e.embedding), e))
            .collect();

        scored.sort_by(|(sim_a, a), (sim_b, b)| {
            sim_b
                .partial_cmp(sim_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.validated_at.cmp(&a.validated_at))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(scored.into_iter().take(k).map(|(_, e)| e.clone()).collect())
    }

    /// Insert a draft, or reinforce an existing near-duplicate.
    ///
    /// When a non-retracted entry in the draft's partition has similarity at
    /// or above the dedup threshold, that entry is reinforced — last-used
    /// timestamp updated, provisional status escalated if the draft is
    /// validated — and its id returned. Otherwise a fresh entry is inserted.
    pub async fn upsert(&self, draft: EntryDraft) -> Result<EntryId, StoreError> {
        let partition = draft.partition();
        let embedding = self.embed(&draft.text).await?;

        let _guard = self.write_lock.lock().await;
        let mut state = self.state.write().await;
        let id = self.apply_upsert(&mut state, draft, embedding)?;

        let entries = &state.partitions[&partition];
        self.storage.save_partition(partition, entries).await?;
        Ok(id)
    }

    /// Idempotent soft retract. Unknown ids and already-retracted entries
    /// are left untouched and raise no error.
    pub async fn retract(&self, id: &EntryId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.state.write().await;

        let mut touched = None;
        for (partition, entries) in state.partitions.iter_mut() {
            if let Some(entry) = entries.iter_mut().find(|e| &e.id == id) {
                if !entry.status.is_retracted() {
                    entry.status = ValidationStatus::Retracted;
                    touched = Some(*partition);
                    debug!(id = %id, "Retracted knowledge entry");
                }
                break;
            }
        }

        if let Some(partition) = touched {
            let entries = &state.partitions[&partition];
            self.storage.save_partition(partition, entries).await?;
        }
        Ok(())
    }

    /// All-or-nothing batch write for one concluded session.
    ///
    /// Embeds every draft first, then applies the upserts and persists the
    /// affected partitions under the writer lock. If any persist fails, the
    /// in-memory state is restored to the pre-batch snapshot and partitions
    /// already written this batch are re-saved from that snapshot, so a
    /// crashed distillation never leaves partial knowledge behind — in
    /// memory or on disk.
    pub async fn commit_session(
        &self,
        drafts: Vec<EntryDraft>,
    ) -> Result<Vec<EntryId>, StoreError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embedded = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let vector = self.embed(&draft.text).await?;
            embedded.push((draft, vector));
        }

        let _guard = self.write_lock.lock().await;
        let mut state = self.state.write().await;

        let mut affected: Vec<Partition> = Vec::new();
        for (draft, _) in &embedded {
            let partition = draft.partition();
            if !affected.contains(&partition) {
                affected.push(partition);
            }
        }
        let snapshot: HashMap<Partition, Vec<KnowledgeEntry>> = affected
            .iter()
            .map(|p| (*p, state.partitions.get(p).cloned().unwrap_or_default()))
            .collect();

        let mut ids = Vec::with_capacity(embedded.len());
        for (draft, vector) in embedded {
            match self.apply_upsert(&mut state, draft, vector) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    state.partitions.extend(snapshot.clone());
                    return Err(e);
                }
            }
        }

        let mut persisted: Vec<Partition> = Vec::new();
        for partition in &affected {
            let entries = state.partitions[partition].clone();
            if let Err(e) = self.storage.save_partition(*partition, &entries).await {
                warn!(partition = %partition, "Session write failed, rolling back: {}", e);
                // Disk must match the rolled-back memory: put partitions
                // already written this batch back to their snapshot
                for prev in persisted {
                    if let Err(undo) = self.storage.save_partition(prev, &snapshot[&prev]).await
                    {
                        warn!(partition = %prev, "Rollback re-save failed: {}", undo);
                    }
                }
                state.partitions.extend(snapshot);
                return Err(e.into());
            }
            persisted.push(*partition);
        }

        info!(written = ids.len(), "Committed session knowledge");
        Ok(ids)
    }

    /// Retract provisional entries whose last use is older than `max_age_ms`.
    pub async fn prune_stale(&self, now: u64, max_age_ms: u64) -> Result<Vec<EntryId>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.state.write().await;

        let mut pruned = Vec::new();
        let mut touched = Vec::new();
        for (partition, entries) in state.partitions.iter_mut() {
            let mut changed = false;
            for entry in entries.iter_mut() {
                if entry.status == ValidationStatus::Provisional
                    && now.saturating_sub(entry.last_used) > max_age_ms
                {
                    entry.status = ValidationStatus::Retracted;
                    pruned.push(entry.id.clone());
                    changed = true;
                }
            }
            if changed {
                touched.push(*partition);
            }
        }

        for partition in touched {
            let entries = &state.partitions[&partition];
            self.storage.save_partition(partition, entries).await?;
        }

        if !pruned.is_empty() {
            info!(pruned = pruned.len(), "Pruned stale provisional entries");
        }
        Ok(pruned)
    }

    /// Persist every partition (shutdown flush).
    pub async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let state = self.state.read().await;
        for (partition, entries) in &state.partitions {
            self.storage.save_partition(*partition, entries).await?;
        }
        Ok(())
    }

    /// Number of non-retracted entries in a partition.
    pub async fn live_entries(&self, partition: Partition) -> usize {
        let state = self.state.read().await;
        state
            .partitions
            .get(&partition)
            .map(|entries| entries.iter().filter(|e| !e.status.is_retracted()).count())
            .unwrap_or(0)
    }

    /// Look up an entry by id (diagnostics and tests).
    pub async fn entry(&self, id: &EntryId) -> Option<KnowledgeEntry> {
        let state = self.state.read().await;
        state
            .partitions
            .values()
            .flat_map(|entries| entries.iter())
            .find(|e| &e.id == id)
            .cloned()
    }

    // ==================== internals ====================

    async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let vector = with_retries(self.retry_limit, || self.embedder.embed(text)).await?;
        Ok(vector)
    }

    /// In-memory upsert under the writer lock; does not persist.
    fn apply_upsert(
        &self,
        state: &mut StoreState,
        draft: EntryDraft,
        embedding: Vec<f32>,
    ) -> Result<EntryId, StoreError> {
        state.check_dimension(&embedding)?;

        let now = current_timestamp();
        let partition = draft.partition();
        let entries = state.partitions.entry(partition).or_default();

        let duplicate = entries
            .iter_mut()
            .filter(|e| !e.status.is_retracted())
            .map(|e| {
                let sim = cosine_similarity(&embedding, &e.embedding);
                (sim, e)
            })
            .filter(|(sim, _)| *sim >= self.dedup_threshold)
            .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((sim, existing)) = duplicate {
            existing.last_used = now;
            if draft.status == ValidationStatus::Validated
                && existing.status == ValidationStatus::Provisional
            {
                existing.status = ValidationStatus::Validated;
                existing.validated_at = Some(now);
            }
            debug!(id = %existing.id, similarity = sim, "Reinforced near-duplicate entry");
            return Ok(existing.id.clone());
        }

        let id = EntryId::new(format!(
            "{}-{}-{}",
            partition.as_str(),
            now,
            self.seq.fetch_add(1, Ordering::Relaxed)
        ));
        let validated_at =
            (draft.status == ValidationStatus::Validated).then_some(now);
        entries.push(KnowledgeEntry {
            id: id.clone(),
            kind: draft.kind,
            source_case: draft.source_case,
            embedding,
            text: draft.text,
            status: draft.status,
            created_at: now,
            last_used: now,
            validated_at,
        });
        debug!(id = %id, partition = %partition, "Inserted knowledge entry");
        Ok(id)
    }

}

/// Get current timestamp in milliseconds since the Unix epoch
fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
