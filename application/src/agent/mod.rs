//! Panel agents: role-parameterized reasoning units.

pub mod retry;
pub mod role_agent;

pub use retry::with_retries;
pub use role_agent::{AgentRole, GenerationError};
