//! Shared configuration and utilities for the verification code services
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration types (Redis connection, verification policy settings)
//! - Utility functions (subject masking for logs)

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{CacheConfig, VerificationConfig};
pub use utils::masking;
