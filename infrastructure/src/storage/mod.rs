//! File-backed knowledge persistence.

pub mod json_partition_store;

pub use json_partition_store::JsonPartitionStore;
