//! Core domain concepts: cases, roles, and errors.

pub mod case;
pub mod error;
pub mod role;
