//! Account snapshot carried inside tokens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal identity of an account
///
/// The account record itself lives in the relational store; tokens only carry
/// this snapshot, taken at signing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    /// Account id
    pub id: Uuid,

    /// Role id (the administrator role is configurable)
    pub role_id: u32,
}

impl AccountIdentity {
    pub fn new(id: Uuid, role_id: u32) -> Self {
        Self { id, role_id }
    }
}
