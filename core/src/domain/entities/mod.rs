//! Domain entities representing core business objects.

pub mod account;
pub mod token;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use account::AccountIdentity;
pub use token::{
    account_key_prefix, session_key, IdentityClaims, RefreshClaims, RefreshTokenSession,
    SignedRefreshToken, TokenKind, TokenPair, VerifiedClaims,
};
