//! Application configuration.

pub mod discussion_config;

pub use discussion_config::{ConfigError, DiscussionConfig};
