//! Domain layer containing the account snapshot and token entities.

pub mod entities;

// Re-export commonly used domain types
pub use entities::*;
