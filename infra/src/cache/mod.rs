//! Cache module for the Redis-backed session store
//!
//! This module provides the Redis client with connection retry and command
//! timeouts, and the `SessionStore` implementation built on top of it.

pub mod redis_client;
pub mod session_store;


pub use redis_client::RedisClient;
pub use session_store::RedisSessionStore;

// Re-export commonly used types
pub use gp_shared::config::CacheConfig;
