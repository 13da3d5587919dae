//! Business services containing the token lifecycle logic.

pub mod token;

// Re-export commonly used types
pub use token::{
    extract_bearer_token, ClaimsCodec, KeyMaterial, RequestContext, RoleRequirement,
    TokenLifecycleConfig, TokenLifecycleManager,
};
