//! Store key naming
//!
//! All keys are derived here, from the namespace, the subject and (for daily
//! state) the calendar day:
//! - `{ns}VerificationCode{subject}` - active code
//! - `{ns}VerificationCodeSet{subject}{YYYYMMDD}` - unconsumed codes of the day
//! - `{ns}VerificationCodeErrorCount{subject}{YYYYMMDD}` - failures of the day
//! - `{ns}VerificationCodeLastErrorTime{subject}{YYYYMMDD}` - last failure time

use crate::domain::value_objects::calendar_day::CalendarDay;
use crate::errors::{DomainError, DomainResult};

/// Namespaced key builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    /// Create a key space for a namespace
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidConfig`] for an empty namespace.
    pub fn new(namespace: impl Into<String>) -> DomainResult<Self> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(DomainError::invalid_config("namespace must not be empty"));
        }
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn active_code(&self, subject: &str) -> String {
        format!("{}VerificationCode{}", self.namespace, subject)
    }

    pub fn unconsumed_set(&self, subject: &str, day: &CalendarDay) -> String {
        format!("{}VerificationCodeSet{}{}", self.namespace, subject, day.stamp())
    }

    pub fn failure_count(&self, subject: &str, day: &CalendarDay) -> String {
        format!("{}VerificationCodeErrorCount{}{}", self.namespace, subject, day.stamp())
    }

    pub fn last_failure(&self, subject: &str, day: &CalendarDay) -> String {
        format!("{}VerificationCodeLastErrorTime{}{}", self.namespace, subject, day.stamp())
    }
}
