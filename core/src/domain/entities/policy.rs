//! Verification policy entity
//!
//! Holds the thresholds the abuse checks compare against. A single policy is
//! usually shared (`Arc<VerificationPolicy>`) between the service and an
//! administrative caller that tunes it at runtime, so every mutator takes
//! `&self` and readers work on point-in-time snapshots.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;
use vc_shared::config::VerificationConfig;

use crate::errors::{DomainError, DomainResult};

/// Point-in-time copy of the policy values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySettings {
    /// Lifetime of an issued code in seconds, always positive
    pub validity_seconds: i64,
    /// Minimum seconds between two code requests, 0 disables the check
    pub request_interval_seconds: u64,
    /// Daily unconsumed code ceiling, 0 disables the check
    pub unused_code_ceiling: u32,
    /// Daily failed verification ceiling, 0 disables the hard limit
    pub failure_ceiling: u32,
    /// Failure-count threshold -> temporary ban duration in seconds
    pub ban_rules: BTreeMap<u32, u64>,
}

/// Runtime-mutable verification policy
#[derive(Debug)]
pub struct VerificationPolicy {
    settings: RwLock<PolicySettings>,
}

impl VerificationPolicy {
    /// Create a policy
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidConfig`] when `validity_seconds` is not
    /// positive.
    pub fn new(
        validity_seconds: i64,
        request_interval_seconds: u64,
        unused_code_ceiling: u32,
        failure_ceiling: u32,
        ban_rules: BTreeMap<u32, u64>,
    ) -> DomainResult<Self> {
        validate_validity(validity_seconds)?;

        Ok(Self {
            settings: RwLock::new(PolicySettings {
                validity_seconds,
                request_interval_seconds,
                unused_code_ceiling,
                failure_ceiling,
                ban_rules,
            }),
        })
    }

    /// Build a policy from the shared verification configuration
    pub fn from_config(config: &VerificationConfig) -> DomainResult<Self> {
        Self::new(
            config.validity_seconds,
            config.request_interval_seconds,
            config.unused_code_ceiling,
            config.failure_ceiling,
            config.ban_rules.clone(),
        )
    }

    /// Copy of the current settings
    ///
    /// Checks evaluate against a snapshot so a concurrent mutation never
    /// shows up halfway through an evaluation.
    pub fn snapshot(&self) -> PolicySettings {
        self.read().clone()
    }

    pub fn validity_seconds(&self) -> i64 {
        self.read().validity_seconds
    }

    pub fn request_interval_seconds(&self) -> u64 {
        self.read().request_interval_seconds
    }

    pub fn unused_code_ceiling(&self) -> u32 {
        self.read().unused_code_ceiling
    }

    pub fn failure_ceiling(&self) -> u32 {
        self.read().failure_ceiling
    }

    /// Copy of the temporary ban rules
    pub fn ban_rules(&self) -> BTreeMap<u32, u64> {
        self.read().ban_rules.clone()
    }

    /// Change the code lifetime
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidConfig`] and keeps the previous value
    /// when `validity_seconds` is not positive.
    pub fn set_validity_seconds(&self, validity_seconds: i64) -> DomainResult<()> {
        validate_validity(validity_seconds)?;
        self.write().validity_seconds = validity_seconds;
        info!(validity_seconds, "Verification code validity updated");
        Ok(())
    }

    pub fn set_request_interval_seconds(&self, request_interval_seconds: u64) {
        self.write().request_interval_seconds = request_interval_seconds;
        info!(request_interval_seconds, "Request interval threshold updated");
    }

    pub fn set_unused_code_ceiling(&self, unused_code_ceiling: u32) {
        self.write().unused_code_ceiling = unused_code_ceiling;
        info!(unused_code_ceiling, "Unused code ceiling updated");
    }

    pub fn set_failure_ceiling(&self, failure_ceiling: u32) {
        self.write().failure_ceiling = failure_ceiling;
        info!(failure_ceiling, "Failure ceiling updated");
    }

    /// Add or replace the ban rule for a failure-count threshold
    pub fn add_ban_rule(&self, threshold: u32, ban_seconds: u64) {
        self.write().ban_rules.insert(threshold, ban_seconds);
        info!(threshold, ban_seconds, "Temporary ban rule added");
    }

    /// Remove the ban rule for a failure-count threshold, returning its duration
    pub fn remove_ban_rule(&self, threshold: u32) -> Option<u64> {
        let removed = self.write().ban_rules.remove(&threshold);
        if removed.is_some() {
            info!(threshold, "Temporary ban rule removed");
        }
        removed
    }

    fn read(&self) -> RwLockReadGuard<'_, PolicySettings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PolicySettings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_validity(validity_seconds: i64) -> DomainResult<()> {
    if validity_seconds <= 0 {
        return Err(DomainError::invalid_config(format!(
            "validity duration must be positive, got {}",
            validity_seconds
        )));
    }
    Ok(())
}
