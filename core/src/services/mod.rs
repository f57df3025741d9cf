//! Business services containing the verification code use cases.

pub mod verification;

// Re-export commonly used types
pub use verification::{
    AbuseCheckEngine, Clock, ManualClock, MemoryStore, StateReader, SystemClock,
    VerificationCodeService, VerificationStore,
};
