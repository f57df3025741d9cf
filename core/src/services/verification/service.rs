//! Verification code lifecycle service

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{error, info, warn};
use vc_shared::masking::mask_subject;

use crate::domain::entities::policy::VerificationPolicy;
use crate::domain::value_objects::{
    AbuseCheck, CalendarDay, CheckOutcome, ConsumeOutcome, KeySpace, RegisteredPeriod,
};
use crate::errors::DomainResult;

use super::abuse_check::AbuseCheckEngine;
use super::clock::{Clock, SystemClock};
use super::state::StateReader;
use super::traits::VerificationStore;

/// Issues, consumes and polices verification codes within one namespace
///
/// The service never generates or delivers codes; the caller supplies the
/// value and sends it. Callers are expected to run
/// [`pre_check_before_send`](Self::pre_check_before_send) before
/// [`issue_code`](Self::issue_code) and
/// [`pre_check_before_verify`](Self::pre_check_before_verify) before
/// [`consume_code`](Self::consume_code); the service does not enforce that
/// ordering.
///
/// Issuing and recording a failure are each two independent store writes.
/// If the second write fails the first is kept: an issued code may be
/// missing from the unconsumed set, and a failure may be counted without its
/// timestamp. The error is still returned.
pub struct VerificationCodeService<S, C = SystemClock> {
    /// Store holding all per-subject state
    store: Arc<S>,
    /// Key naming for this namespace
    keys: KeySpace,
    /// Shared, runtime-mutable policy
    policy: Arc<VerificationPolicy>,
    /// Time source for TTLs and day-scoped keys
    clock: Arc<C>,
    /// Read-only state queries
    state: StateReader<S, C>,
    /// Abuse predicates
    abuse_checks: AbuseCheckEngine<S, C>,
}

impl<S: VerificationStore + 'static> VerificationCodeService<S, SystemClock> {
    /// Create a service using the wall clock
    ///
    /// # Arguments
    ///
    /// * `store` - Store implementation, probed with a ping before use
    /// * `namespace` - Non-empty key namespace (e.g. "SMS")
    /// * `policy` - Shared policy handle
    ///
    /// # Errors
    ///
    /// * `DomainError::InvalidConfig` - Empty namespace
    /// * `DomainError::Store` - The store is unreachable
    pub async fn new(
        store: Arc<S>,
        namespace: impl Into<String>,
        policy: Arc<VerificationPolicy>,
    ) -> DomainResult<Self> {
        Self::with_clock(store, namespace, policy, Arc::new(SystemClock)).await
    }
}

impl<S, C> VerificationCodeService<S, C>
where
    S: VerificationStore + 'static,
    C: Clock + 'static,
{
    /// Create a service with an explicit clock
    pub async fn with_clock(
        store: Arc<S>,
        namespace: impl Into<String>,
        policy: Arc<VerificationPolicy>,
        clock: Arc<C>,
    ) -> DomainResult<Self> {
        let keys = KeySpace::new(namespace)?;

        store.ping().await.map_err(|e| {
            error!(
                namespace = keys.namespace(),
                error = %e,
                "Verification store is unreachable"
            );
            e
        })?;

        let state = StateReader::new(
            Arc::clone(&store),
            keys.clone(),
            Arc::clone(&policy),
            Arc::clone(&clock),
        );
        let abuse_checks = AbuseCheckEngine::new(state.clone(), Arc::clone(&policy), Arc::clone(&clock));

        info!(namespace = keys.namespace(), "Verification code service created");

        Ok(Self {
            store,
            keys,
            policy,
            clock,
            state,
            abuse_checks,
        })
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    /// Shared policy handle, for querying or tuning thresholds at runtime
    pub fn policy(&self) -> &Arc<VerificationPolicy> {
        &self.policy
    }

    /// Check that the store is reachable
    ///
    /// Worth calling before costly work such as sending an SMS.
    pub async fn verify_connection(&self) -> DomainResult<bool> {
        self.store.ping().await?;
        Ok(true)
    }

    /// Store `code` as the subject's active code and register it as unconsumed
    ///
    /// Any previous active code is overwritten. Its entry in today's
    /// unconsumed set stays until the set expires at midnight.
    pub async fn issue_code(&self, subject: &str, code: &str) -> DomainResult<()> {
        let now = self.clock.now();
        let day = CalendarDay::of(&now);
        let validity = u64::try_from(self.policy.validity_seconds()).unwrap_or(1);

        self.store
            .set_with_ttl(&self.keys.active_code(subject), code, validity)
            .await
            .map_err(|e| {
                error!(
                    subject = %mask_subject(subject),
                    error = %e,
                    event = "code_storage_failed",
                    "Failed to store verification code"
                );
                e
            })?;

        self.register_unconsumed(subject, code, &day).await?;

        info!(
            subject = %mask_subject(subject),
            validity_seconds = validity,
            event = "code_issued",
            "Verification code issued"
        );
        Ok(())
    }

    /// Compare `candidate` with the subject's active code
    ///
    /// A match consumes the code. A mismatch leaves the code active and
    /// records a failure for today.
    pub async fn consume_code(&self, subject: &str, candidate: &str) -> DomainResult<ConsumeOutcome> {
        let Some(code) = self.state.active_code(subject).await? else {
            info!(
                subject = %mask_subject(subject),
                event = "code_not_found",
                "No active verification code (expired or never issued)"
            );
            return Ok(ConsumeOutcome::not_found());
        };

        let now = self.clock.now();
        let day = CalendarDay::of(&now);

        if code == candidate {
            self.store.delete(&self.keys.active_code(subject)).await?;
            self.store
                .set_remove(&self.keys.unconsumed_set(subject, &day), &code)
                .await?;

            info!(
                subject = %mask_subject(subject),
                event = "code_consumed",
                "Verification code consumed"
            );
            Ok(ConsumeOutcome::consumed())
        } else {
            let failures = self.record_failure(subject, &day, &now).await?;

            warn!(
                subject = %mask_subject(subject),
                failures_today = failures,
                event = "code_mismatch",
                "Invalid verification code"
            );
            Ok(ConsumeOutcome::mismatched())
        }
    }

    /// Request frequency, failure rate and unused code checks
    pub async fn pre_check_before_send(&self, subject: &str) -> DomainResult<CheckOutcome> {
        self.abuse_checks.pre_send(subject).await
    }

    /// Failure rate and unused code checks
    pub async fn pre_check_before_verify(&self, subject: &str) -> DomainResult<CheckOutcome> {
        self.abuse_checks.pre_verify(subject).await
    }

    /// Run an arbitrary combination of checks concurrently
    pub async fn check(&self, subject: &str, checks: &[AbuseCheck]) -> DomainResult<CheckOutcome> {
        self.abuse_checks.combined(subject, checks).await
    }

    pub async fn check_request_too_frequent(&self, subject: &str) -> DomainResult<bool> {
        self.abuse_checks
            .evaluate(AbuseCheck::RequestTooFrequent, subject)
            .await
    }

    pub async fn check_unused_code_too_many(&self, subject: &str) -> DomainResult<bool> {
        self.abuse_checks
            .evaluate(AbuseCheck::UnusedCodeTooMany, subject)
            .await
    }

    pub async fn check_verify_fail_too_frequent(&self, subject: &str) -> DomainResult<bool> {
        self.abuse_checks
            .evaluate(AbuseCheck::VerifyFailTooFrequent, subject)
            .await
    }

    /// Remaining lifetime of the active code in seconds, 0 if none
    pub async fn code_ttl(&self, subject: &str) -> DomainResult<u64> {
        self.state.code_ttl(subject).await
    }

    /// How long the active code has been waiting for consumption
    pub async fn registered_period(&self, subject: &str) -> DomainResult<RegisteredPeriod> {
        self.state.registered_period(subject).await
    }

    pub async fn failure_count_today(&self, subject: &str) -> DomainResult<u64> {
        self.state.failure_count_today(subject).await
    }

    pub async fn last_failure_time(&self, subject: &str) -> DomainResult<Option<DateTime<Local>>> {
        self.state.last_failure_time(subject).await
    }

    pub async fn unconsumed_count(&self, subject: &str) -> DomainResult<u64> {
        self.state.unconsumed_count(subject).await
    }

    /// Add the code to today's unconsumed set, expiring at midnight
    async fn register_unconsumed(&self, subject: &str, code: &str, day: &CalendarDay) -> DomainResult<()> {
        let set_key = self.keys.unconsumed_set(subject, day);
        self.store.set_add(&set_key, code).await?;
        self.store.expire_at(&set_key, day.next_midnight()).await
    }

    /// Bump today's failure counter and timestamp, returning the new count
    async fn record_failure(
        &self,
        subject: &str,
        day: &CalendarDay,
        now: &DateTime<Local>,
    ) -> DomainResult<i64> {
        let count_key = self.keys.failure_count(subject, day);
        let failures = self.store.increment(&count_key).await?;
        self.store.expire_at(&count_key, day.next_midnight()).await?;

        self.store
            .set_with_ttl(
                &self.keys.last_failure(subject, day),
                &now.timestamp().to_string(),
                day.seconds_until_next_midnight(now),
            )
            .await?;

        Ok(failures)
    }
}
