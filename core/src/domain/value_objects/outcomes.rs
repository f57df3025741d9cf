//! Results of abuse checks and code consumption

use std::fmt;

/// A single abuse predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbuseCheck {
    /// A code was requested again within the minimum request interval
    RequestTooFrequent,
    /// Too many failed verifications today, or a temporary ban is active
    VerifyFailTooFrequent,
    /// Too many codes issued today without being consumed
    UnusedCodeTooMany,
}

impl AbuseCheck {
    /// Checks run before a code is sent
    pub const PRE_SEND: [AbuseCheck; 3] = [
        AbuseCheck::RequestTooFrequent,
        AbuseCheck::VerifyFailTooFrequent,
        AbuseCheck::UnusedCodeTooMany,
    ];

    /// Checks run before a code is verified
    ///
    /// The request interval is left out: a pending code inside its own window
    /// must still be verifiable.
    pub const PRE_VERIFY: [AbuseCheck; 2] = [
        AbuseCheck::VerifyFailTooFrequent,
        AbuseCheck::UnusedCodeTooMany,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AbuseCheck::RequestTooFrequent => "request_too_frequent",
            AbuseCheck::VerifyFailTooFrequent => "verify_fail_too_frequent",
            AbuseCheck::UnusedCodeTooMany => "unused_code_too_many",
        }
    }
}

impl fmt::Display for AbuseCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a composite abuse check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckOutcome {
    /// No predicate was violated
    Valid,
    UnusedCodeTooMany,
    RequestTooFrequent,
    VerifyFailTooFrequent,
}

impl CheckOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, CheckOutcome::Valid)
    }

    /// The violated predicate, if any
    pub fn violation(&self) -> Option<AbuseCheck> {
        match self {
            CheckOutcome::Valid => None,
            CheckOutcome::UnusedCodeTooMany => Some(AbuseCheck::UnusedCodeTooMany),
            CheckOutcome::RequestTooFrequent => Some(AbuseCheck::RequestTooFrequent),
            CheckOutcome::VerifyFailTooFrequent => Some(AbuseCheck::VerifyFailTooFrequent),
        }
    }
}

impl From<AbuseCheck> for CheckOutcome {
    fn from(check: AbuseCheck) -> Self {
        match check {
            AbuseCheck::RequestTooFrequent => CheckOutcome::RequestTooFrequent,
            AbuseCheck::VerifyFailTooFrequent => CheckOutcome::VerifyFailTooFrequent,
            AbuseCheck::UnusedCodeTooMany => CheckOutcome::UnusedCodeTooMany,
        }
    }
}

/// Result of a consumption attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    /// An active code existed for the subject
    pub found: bool,
    /// The candidate matched and the code was consumed
    pub success: bool,
}

impl ConsumeOutcome {
    pub fn not_found() -> Self {
        Self {
            found: false,
            success: false,
        }
    }

    pub fn consumed() -> Self {
        Self {
            found: true,
            success: true,
        }
    }

    pub fn mismatched() -> Self {
        Self {
            found: true,
            success: false,
        }
    }
}

/// How long the active code has been waiting for consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredPeriod {
    /// An active code exists; `elapsed_seconds` is meaningless otherwise
    pub valid: bool,
    /// Seconds since issuance (validity duration minus remaining TTL)
    pub elapsed_seconds: i64,
}
