//! Abuse check engine
//!
//! Each predicate reads the subject's state and compares it with a snapshot
//! of the policy. [`AbuseCheckEngine::combined`] runs a set of predicates as
//! concurrent tasks and settles on whichever result decides the outcome
//! first: a violation or a store error ends the check immediately, while a
//! clean outcome needs every task to report back.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use vc_shared::masking::mask_subject;

use crate::domain::entities::policy::{PolicySettings, VerificationPolicy};
use crate::domain::value_objects::{AbuseCheck, CheckOutcome};
use crate::errors::{DomainError, DomainResult};

use super::clock::Clock;
use super::state::StateReader;
use super::traits::VerificationStore;

/// Evaluates abuse predicates for a subject
pub struct AbuseCheckEngine<S, C> {
    state: StateReader<S, C>,
    policy: Arc<VerificationPolicy>,
    clock: Arc<C>,
}

impl<S, C> Clone for AbuseCheckEngine<S, C> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            policy: Arc::clone(&self.policy),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> AbuseCheckEngine<S, C>
where
    S: VerificationStore + 'static,
    C: Clock + 'static,
{
    pub fn new(state: StateReader<S, C>, policy: Arc<VerificationPolicy>, clock: Arc<C>) -> Self {
        Self {
            state,
            policy,
            clock,
        }
    }

    /// Evaluate one predicate against the current policy
    pub async fn evaluate(&self, check: AbuseCheck, subject: &str) -> DomainResult<bool> {
        let settings = self.policy.snapshot();
        match check {
            AbuseCheck::RequestTooFrequent => self.request_too_frequent(subject, &settings).await,
            AbuseCheck::VerifyFailTooFrequent => {
                self.verify_fail_too_frequent(subject, &settings).await
            }
            AbuseCheck::UnusedCodeTooMany => self.unused_code_too_many(subject, &settings).await,
        }
    }

    /// Run `checks` concurrently and report the first violation
    ///
    /// Results are consumed in completion order. The first violation or
    /// store error wins; outstanding tasks are aborted when the join set is
    /// dropped. An empty `checks` slice is always valid.
    pub async fn combined(&self, subject: &str, checks: &[AbuseCheck]) -> DomainResult<CheckOutcome> {
        let mut tasks = JoinSet::new();
        for &check in checks {
            let engine = self.clone();
            let subject = subject.to_string();
            tasks.spawn(async move {
                let result = engine.evaluate(check, &subject).await;
                (check, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (check, result) = joined.map_err(|e| {
                error!(error = %e, "Abuse check task failed to complete");
                DomainError::Internal {
                    message: format!("abuse check task failed: {}", e),
                }
            })?;

            match result {
                Ok(false) => debug!(check = %check, "Abuse check passed"),
                Ok(true) => {
                    warn!(
                        subject = %mask_subject(subject),
                        check = %check,
                        event = "abuse_check_violated",
                        "Verification abuse check violated"
                    );
                    return Ok(CheckOutcome::from(check));
                }
                Err(e) => {
                    error!(
                        subject = %mask_subject(subject),
                        check = %check,
                        error = %e,
                        "Abuse check aborted by store error"
                    );
                    return Err(e);
                }
            }
        }

        Ok(CheckOutcome::Valid)
    }

    /// Checks run before sending a code
    pub async fn pre_send(&self, subject: &str) -> DomainResult<CheckOutcome> {
        self.combined(subject, &AbuseCheck::PRE_SEND).await
    }

    /// Checks run before verifying a code
    pub async fn pre_verify(&self, subject: &str) -> DomainResult<CheckOutcome> {
        self.combined(subject, &AbuseCheck::PRE_VERIFY).await
    }

    /// The previous code is still active and was issued within the interval
    async fn request_too_frequent(
        &self,
        subject: &str,
        settings: &PolicySettings,
    ) -> DomainResult<bool> {
        if settings.request_interval_seconds == 0 {
            return Ok(false);
        }

        let ttl = self.state.code_ttl(subject).await?;
        if ttl == 0 {
            return Ok(false);
        }

        let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
        let elapsed = settings.validity_seconds.saturating_sub(ttl);
        let interval = i64::try_from(settings.request_interval_seconds).unwrap_or(i64::MAX);
        Ok(elapsed <= interval)
    }

    /// Too many codes were issued today without being consumed
    ///
    /// Exactly at the ceiling the subject is only blocked while a code is
    /// still pending.
    async fn unused_code_too_many(
        &self,
        subject: &str,
        settings: &PolicySettings,
    ) -> DomainResult<bool> {
        let ceiling = u64::from(settings.unused_code_ceiling);
        if ceiling == 0 {
            return Ok(false);
        }

        let count = self.state.unconsumed_count(subject).await?;
        if count < ceiling {
            return Ok(false);
        }
        if count > ceiling {
            return Ok(true);
        }

        Ok(self.state.active_code(subject).await?.is_some())
    }

    /// Failure ceiling reached, or a temporary ban window is still open
    async fn verify_fail_too_frequent(
        &self,
        subject: &str,
        settings: &PolicySettings,
    ) -> DomainResult<bool> {
        let count = self.state.failure_count_today(subject).await?;
        if count == 0 {
            return Ok(false);
        }

        if settings.failure_ceiling > 0 && count >= u64::from(settings.failure_ceiling) {
            return Ok(true);
        }

        if settings.ban_rules.is_empty() {
            return Ok(false);
        }

        let Some(last_failure) = self.state.last_failure_time(subject).await? else {
            return Ok(false);
        };
        let since_last = (self.clock.now() - last_failure).num_seconds();

        // Any matching rule bans; rules are not ranked against each other.
        Ok(settings.ban_rules.iter().any(|(&threshold, &ban_seconds)| {
            count >= u64::from(threshold)
                && since_last <= i64::try_from(ban_seconds).unwrap_or(i64::MAX)
        }))
    }
}
