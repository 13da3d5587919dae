//! Token service module
//!
//! This module handles all token-related operations including:
//! - RSA key material for identity tokens and the refresh-token secret
//! - Signing and parsing of identity and refresh claims
//! - Pair issuance with rotation-on-reuse detection
//! - Single-session and bulk revocation
//! - Deadlines and cancellation for session store calls

mod bearer;
mod codec;
mod config;
mod context;
mod key_manager;
mod service;

#[cfg(test)]
mod tests;

pub use bearer::extract_bearer_token;
pub use codec::{ClaimsCodec, RoleRequirement};
pub use config::TokenLifecycleConfig;
pub use context::{CancelHandle, RequestContext};
pub use key_manager::{generate_rsa_pem_pair, KeyMaterial};
pub use service::TokenLifecycleManager;
