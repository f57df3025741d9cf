//! Configuration module
//!
//! - `cache` - Redis connection configuration
//! - `verification` - Verification code policy settings

pub mod cache;
pub mod verification;

pub use cache::CacheConfig;
pub use verification::{parse_ban_rules, VerificationConfig};
