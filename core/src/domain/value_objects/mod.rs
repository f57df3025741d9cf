//! Value objects: calendar days, key naming and check outcomes.

pub mod calendar_day;
pub mod key_space;
pub mod outcomes;

pub use calendar_day::CalendarDay;
pub use key_space::KeySpace;
pub use outcomes::{AbuseCheck, CheckOutcome, ConsumeOutcome, RegisteredPeriod};
