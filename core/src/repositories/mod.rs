pub mod session;

pub use session::{InMemorySessionStore, ScanPage, SessionStore};
