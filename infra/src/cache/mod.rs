//! Cache module for Redis-backed verification state
//!
//! This module provides the Redis client (connection retry, single-shot
//! commands) and the store adapter the verification services run on.

pub mod redis_client;
pub mod redis_store;


pub use redis_client::RedisClient;
pub use redis_store::RedisVerificationStore;

// Re-export commonly used types
pub use vc_shared::config::CacheConfig;
