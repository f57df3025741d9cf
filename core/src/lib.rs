//! # Verification Code Core
//!
//! Domain layer for one-time verification codes: the issuance and
//! consumption lifecycle, the abuse prevention policy, and the concurrent
//! abuse check engine. Storage is reached only through the
//! [`VerificationStore`] contract so that any key-value backend with
//! per-key expiry can be plugged in.

pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use services::*;
