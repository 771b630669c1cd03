//! Knowledge records: entries, validation status, and partitions.

pub mod entry;
pub mod partition;

pub use entry::{EntryDraft, EntryId, KnowledgeEntry, KnowledgeKind, ValidationStatus};
pub use partition::Partition;
