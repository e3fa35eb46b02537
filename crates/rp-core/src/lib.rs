//! rp-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for the other rp-* crates,
//! providing type-safe identifiers, a unified error type, application
//! configuration, and a broadcast event bus for form progress.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
