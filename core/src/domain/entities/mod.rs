//! Domain entities representing core business objects.

pub mod policy;


pub use policy::{PolicySettings, VerificationPolicy};
