//! Verification code service module
//!
//! This module provides the complete verification code workflow:
//! - Issuing codes and registering them as unconsumed for the day
//! - Consuming codes with failure tracking
//! - Concurrent abuse checks (request frequency, failure rate, unused codes)
//! - Read-only queries over the per-subject state

mod abuse_check;
mod clock;
mod memory_store;
mod service;
mod state;
mod traits;

#[cfg(test)]
mod tests;

pub use abuse_check::AbuseCheckEngine;
pub use clock::{Clock, ManualClock, SystemClock};
pub use memory_store::MemoryStore;
pub use service::VerificationCodeService;
pub use state::StateReader;
pub use traits::VerificationStore;
