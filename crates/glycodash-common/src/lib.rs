//! glycodash-common — Shared error taxonomy and identifiers used across all Glycodash crates.

pub mod error;
pub mod ids;

pub use error::{GlycodashError, Result};
pub use ids::SessionId;
