//! Storage for the Sortie backend.
//!
//! This crate provides a storage abstraction for users, events and
//! conversations. It supports an in-memory store (for development and tests)
//! and SQLite (for persistent deployments).

mod error;
mod memory;
mod sqlite;
mod traits;

#[cfg(test)]
mod contract;

pub use error::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;
