//! # Gopay Core
//!
//! Token lifecycle domain layer for the Gopay account service.
//! This crate contains the token entities, the error taxonomy, the session store
//! contract and the services that sign, validate, rotate and revoke credentials.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod errors;

// Re-export commonly used types for convenience
pub use domain::*;
pub use services::*;
pub use repositories::*;
pub use errors::*;
