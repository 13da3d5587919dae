pub mod r#trait {
    pub use super::trait_::*;
}
#[path = "trait.rs"]
mod trait_;
pub mod memory;

pub use memory::InMemorySessionStore;
pub use r#trait::{escape_glob, ScanPage, SessionStore, DEFAULT_SCAN_BATCH_SIZE};
