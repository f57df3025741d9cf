//! Read-only queries over the per-subject verification state

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

use crate::domain::entities::policy::VerificationPolicy;
use crate::domain::value_objects::{CalendarDay, KeySpace, RegisteredPeriod};
use crate::errors::{DomainError, DomainResult};

use super::clock::Clock;
use super::traits::VerificationStore;

/// Reads the active code, daily counters and unconsumed set of a subject
///
/// Absent state is reported as a zero value, never as an error.
pub struct StateReader<S, C> {
    store: Arc<S>,
    keys: KeySpace,
    policy: Arc<VerificationPolicy>,
    clock: Arc<C>,
}

impl<S, C> Clone for StateReader<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: self.keys.clone(),
            policy: Arc::clone(&self.policy),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: VerificationStore, C: Clock> StateReader<S, C> {
    pub fn new(
        store: Arc<S>,
        keys: KeySpace,
        policy: Arc<VerificationPolicy>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            store,
            keys,
            policy,
            clock,
        }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    fn today(&self) -> CalendarDay {
        CalendarDay::of(&self.clock.now())
    }

    /// The active code value, if one is pending
    pub async fn active_code(&self, subject: &str) -> DomainResult<Option<String>> {
        self.store.get(&self.keys.active_code(subject)).await
    }

    /// Remaining lifetime of the active code in seconds, 0 if none
    pub async fn code_ttl(&self, subject: &str) -> DomainResult<u64> {
        self.store.ttl_remaining(&self.keys.active_code(subject)).await
    }

    /// Seconds the active code has been waiting for consumption
    pub async fn registered_period(&self, subject: &str) -> DomainResult<RegisteredPeriod> {
        let ttl = self.code_ttl(subject).await?;
        let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
        Ok(RegisteredPeriod {
            valid: ttl > 0,
            elapsed_seconds: self.policy.validity_seconds().saturating_sub(ttl),
        })
    }

    /// Failed verification attempts recorded today
    pub async fn failure_count_today(&self, subject: &str) -> DomainResult<u64> {
        let key = self.keys.failure_count(subject, &self.today());
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(0);
        };
        let count = raw
            .parse::<i64>()
            .map_err(|_| DomainError::store(format!("corrupt failure counter at '{}'", key)))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Time of today's most recent failed verification
    pub async fn last_failure_time(&self, subject: &str) -> DomainResult<Option<DateTime<Local>>> {
        let key = self.keys.last_failure(subject, &self.today());
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let seconds = raw
            .parse::<i64>()
            .map_err(|_| DomainError::store(format!("corrupt failure timestamp at '{}'", key)))?;
        let instant = Local.timestamp_opt(seconds, 0).single().ok_or_else(|| {
            DomainError::store(format!("failure timestamp at '{}' is out of range", key))
        })?;
        debug!("Last failure for key '{}' at {}", key, instant);
        Ok(Some(instant))
    }

    /// Codes issued today that have not been consumed
    pub async fn unconsumed_count(&self, subject: &str) -> DomainResult<u64> {
        self.store
            .set_cardinality(&self.keys.unconsumed_set(subject, &self.today()))
            .await
    }
}
