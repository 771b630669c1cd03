//! Transcript logging adapters.

pub mod jsonl_transcript;

pub use jsonl_transcript::JsonlTranscriptLogger;
