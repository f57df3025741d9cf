//! Tests for the abuse check engine

use chrono::Duration;
use std::sync::Arc;

use super::mocks::*;
use crate::domain::value_objects::{AbuseCheck, CheckOutcome};
use crate::errors::DomainError;
use crate::services::verification::{
    ManualClock, MemoryStore, VerificationCodeService, VerificationStore,
};

/// Issue `count` distinct codes without moving the clock
async fn issue_codes(fixture: &Fixture, count: usize) {
    for i in 0..count {
        fixture
            .service
            .issue_code(SUBJECT, &format!("{:06}", 100000 + i))
            .await
            .unwrap();
    }
}

async fn fail_verifications(fixture: &Fixture, count: usize) {
    for _ in 0..count {
        let outcome = fixture.service.consume_code(SUBJECT, "000000").await.unwrap();
        assert!(outcome.found && !outcome.success);
    }
}

async fn service_over<S>(store: S, clock: Arc<ManualClock>) -> VerificationCodeService<S, ManualClock>
where
    S: VerificationStore + 'static,
{
    VerificationCodeService::with_clock(Arc::new(store), "SMS", default_policy(), clock)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_fresh_subject_is_valid() {
    let f = fixture(default_policy()).await;

    assert_eq!(f.service.pre_check_before_send(SUBJECT).await.unwrap(), CheckOutcome::Valid);
    assert_eq!(f.service.pre_check_before_verify(SUBJECT).await.unwrap(), CheckOutcome::Valid);
}

#[tokio::test]
async fn test_empty_check_set_is_valid() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 1).await;

    assert_eq!(f.service.check(SUBJECT, &[]).await.unwrap(), CheckOutcome::Valid);
}

#[tokio::test]
async fn test_request_interval_window() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 1).await;

    assert!(f.service.check_request_too_frequent(SUBJECT).await.unwrap());
    assert_eq!(
        f.service.pre_check_before_send(SUBJECT).await.unwrap(),
        CheckOutcome::RequestTooFrequent
    );

    // Inclusive at exactly the interval
    f.clock.advance(Duration::seconds(60));
    assert!(f.service.check_request_too_frequent(SUBJECT).await.unwrap());

    f.clock.advance(Duration::seconds(1));
    assert!(!f.service.check_request_too_frequent(SUBJECT).await.unwrap());
    assert_eq!(f.service.pre_check_before_send(SUBJECT).await.unwrap(), CheckOutcome::Valid);
}

#[tokio::test]
async fn test_request_interval_after_code_expired() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 1).await;

    f.clock.advance(Duration::seconds(300));

    assert!(!f.service.check_request_too_frequent(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_zero_interval_disables_frequency_check() {
    let f = fixture(policy(300, 0, 5, 10, &[])).await;
    issue_codes(&f, 1).await;

    assert!(!f.service.check_request_too_frequent(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_pre_verify_ignores_request_interval() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 1).await;

    assert_eq!(f.service.pre_check_before_verify(SUBJECT).await.unwrap(), CheckOutcome::Valid);
}

#[tokio::test]
async fn test_unused_codes_at_ceiling_with_active_code() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 4).await;
    assert!(!f.service.check_unused_code_too_many(SUBJECT).await.unwrap());

    issue_codes(&f, 5).await;
    assert_eq!(f.service.unconsumed_count(SUBJECT).await.unwrap(), 5);
    assert!(f.service.check_unused_code_too_many(SUBJECT).await.unwrap());
    assert_eq!(
        f.service.pre_check_before_verify(SUBJECT).await.unwrap(),
        CheckOutcome::UnusedCodeTooMany
    );
}

#[tokio::test]
async fn test_unused_codes_at_ceiling_without_active_code() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 5).await;

    // Active code expires, the day's set does not
    f.clock.advance(Duration::seconds(301));

    assert_eq!(f.service.unconsumed_count(SUBJECT).await.unwrap(), 5);
    assert!(!f.service.check_unused_code_too_many(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_unused_codes_above_ceiling() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 6).await;
    f.clock.advance(Duration::seconds(301));

    assert!(f.service.check_unused_code_too_many(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_consumed_code_leaves_unused_count() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 5).await;

    let outcome = f.service.consume_code(SUBJECT, "100004").await.unwrap();

    assert!(outcome.success);
    assert_eq!(f.service.unconsumed_count(SUBJECT).await.unwrap(), 4);
    assert!(!f.service.check_unused_code_too_many(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_zero_unused_ceiling_disables_check() {
    let f = fixture(policy(300, 60, 0, 10, &[])).await;
    issue_codes(&f, 10).await;

    assert!(!f.service.check_unused_code_too_many(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_ban_windows() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 1).await;

    fail_verifications(&f, 2).await;
    assert!(!f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    fail_verifications(&f, 1).await;
    assert!(f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());
    assert_eq!(
        f.service.pre_check_before_verify(SUBJECT).await.unwrap(),
        CheckOutcome::VerifyFailTooFrequent
    );

    f.clock.advance(Duration::seconds(40));
    assert!(f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    f.clock.advance(Duration::seconds(1));
    assert!(!f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    // Five failures open the longer window
    fail_verifications(&f, 2).await;
    f.clock.advance(Duration::seconds(100));
    assert!(f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    f.clock.advance(Duration::seconds(21));
    assert!(!f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_failure_ceiling_holds_for_the_day() {
    let f = fixture(policy(300, 60, 5, 5, &[])).await;
    issue_codes(&f, 1).await;

    fail_verifications(&f, 4).await;
    assert!(!f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    fail_verifications(&f, 1).await;
    f.clock.advance(Duration::hours(3));

    assert!(f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_ban_rules_without_ceiling() {
    let f = fixture(policy(300, 60, 5, 0, &[(3, 40)])).await;
    issue_codes(&f, 1).await;
    fail_verifications(&f, 8).await;

    assert!(f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    f.clock.advance(Duration::seconds(41));
    assert!(!f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_policy_changes_apply_to_next_check() {
    let f = fixture(policy(300, 60, 5, 0, &[])).await;
    issue_codes(&f, 1).await;
    fail_verifications(&f, 3).await;
    assert!(!f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    f.service.policy().add_ban_rule(3, 40);
    assert!(f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    assert_eq!(f.service.policy().remove_ban_rule(3), Some(40));
    assert!(!f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    f.service.policy().set_failure_ceiling(3);
    assert!(f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());

    f.service.policy().set_request_interval_seconds(0);
    assert!(!f.service.check_request_too_frequent(SUBJECT).await.unwrap());
}

#[tokio::test]
async fn test_daily_state_rolls_over_at_midnight() {
    let f = fixture_at(default_policy(), Arc::new(ManualClock::new(local(2024, 6, 12, 23, 59, 0)))).await;
    issue_codes(&f, 6).await;
    fail_verifications(&f, 3).await;
    assert!(f.service.check_verify_fail_too_frequent(SUBJECT).await.unwrap());
    assert!(f.service.check_unused_code_too_many(SUBJECT).await.unwrap());

    f.clock.advance(Duration::seconds(61));

    assert_eq!(f.service.failure_count_today(SUBJECT).await.unwrap(), 0);
    assert_eq!(f.service.unconsumed_count(SUBJECT).await.unwrap(), 0);
    assert_eq!(f.service.last_failure_time(SUBJECT).await.unwrap(), None);
    assert_eq!(f.service.pre_check_before_send(SUBJECT).await.unwrap(), CheckOutcome::Valid);
    // Yesterday's keys were dropped by their own expiry
    assert_eq!(f.store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_violation_is_still_reported() {
    let clock = test_clock();
    let store = DelayedStore::new(
        MemoryStore::with_clock(Arc::clone(&clock)),
        &[("ttl_remaining", 200)],
    );
    let service = service_over(store, clock).await;
    service.issue_code(SUBJECT, "123456").await.unwrap();

    let started = tokio::time::Instant::now();
    let outcome = service.pre_check_before_send(SUBJECT).await.unwrap();

    assert_eq!(outcome, CheckOutcome::RequestTooFrequent);
    assert!(started.elapsed() >= std::time::Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_fast_violation_does_not_wait_for_slow_checks() {
    let clock = test_clock();
    let store = DelayedStore::new(
        MemoryStore::with_clock(Arc::clone(&clock)),
        &[("ttl_remaining", 500), ("set_cardinality", 500)],
    );
    let service = service_over(store, clock).await;
    service.issue_code(SUBJECT, "123456").await.unwrap();
    for _ in 0..10 {
        service.consume_code(SUBJECT, "000000").await.unwrap();
    }

    let started = tokio::time::Instant::now();
    let outcome = service.pre_check_before_send(SUBJECT).await.unwrap();

    // The request interval is violated too, but reports later
    assert_eq!(outcome, CheckOutcome::VerifyFailTooFrequent);
    assert!(started.elapsed() < std::time::Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_error_before_violation_wins() {
    let clock = test_clock();
    let store = DelayedStore::new(
        FailingStore::new(MemoryStore::with_clock(Arc::clone(&clock)), &["set_cardinality"]),
        &[("ttl_remaining", 300)],
    );
    let service = service_over(store, clock).await;
    service.issue_code(SUBJECT, "123456").await.unwrap();

    let result = service.pre_check_before_send(SUBJECT).await;

    assert!(matches!(result, Err(DomainError::Store { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_violation_before_error_wins() {
    let clock = test_clock();
    let store = DelayedStore::new(
        FailingStore::new(MemoryStore::with_clock(Arc::clone(&clock)), &["set_cardinality"]),
        &[("set_cardinality", 300)],
    );
    let service = service_over(store, clock).await;
    service.issue_code(SUBJECT, "123456").await.unwrap();

    let outcome = service.pre_check_before_send(SUBJECT).await.unwrap();

    assert_eq!(outcome, CheckOutcome::RequestTooFrequent);
}

#[tokio::test]
async fn test_single_check_errors_propagate() {
    let clock = test_clock();
    let store = FailingStore::new(MemoryStore::with_clock(Arc::clone(&clock)), &["get"]);
    let service = service_over(store, clock).await;

    let result = service.check(SUBJECT, &[AbuseCheck::VerifyFailTooFrequent]).await;

    assert!(result.unwrap_err().is_store_error());
}

#[tokio::test]
async fn test_outcome_names_violated_check() {
    let f = fixture(default_policy()).await;
    issue_codes(&f, 1).await;

    let outcome = f
        .service
        .check(SUBJECT, &[AbuseCheck::RequestTooFrequent])
        .await
        .unwrap();

    assert!(!outcome.is_valid());
    assert_eq!(outcome.violation(), Some(AbuseCheck::RequestTooFrequent));
}
