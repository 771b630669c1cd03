//! Prompt construction for panel roles.

pub mod template;

pub use template::PromptTemplate;
