//! Shared configuration and response types for the Gopay auth services
//!
//! This crate provides functionality used across all server modules:
//! - Configuration types (keys, token lifetimes, Redis, logging)
//! - The client-facing error response structure

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, Environment, KeyConfig, LogFormat, LoggingConfig,
};
pub use errors::{error_codes, ErrorResponse, IntoErrorResponse};
