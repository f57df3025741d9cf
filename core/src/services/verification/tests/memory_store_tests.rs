//! Tests for MemoryStore

use chrono::Duration;
use std::sync::Arc;

use super::mocks::*;
use crate::errors::DomainError;
use crate::services::verification::{Clock, ManualClock, MemoryStore, VerificationStore};

fn store() -> (TestStore, Arc<ManualClock>) {
    let clock = test_clock();
    (MemoryStore::with_clock(Arc::clone(&clock)), clock)
}

#[tokio::test]
async fn test_set_and_get() {
    let (store, _) = store();

    store.set_with_ttl("key", "value", 60).await.unwrap();

    assert_eq!(store.get("key").await.unwrap(), Some("value".to_string()));
    assert_eq!(store.get("missing").await.unwrap(), None);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_value_expires_with_clock() {
    let (store, clock) = store();
    store.set_with_ttl("key", "value", 60).await.unwrap();

    clock.advance(Duration::seconds(59));
    assert_eq!(store.ttl_remaining("key").await.unwrap(), 1);
    assert!(store.get("key").await.unwrap().is_some());

    clock.advance(Duration::seconds(1));
    assert_eq!(store.get("key").await.unwrap(), None);
    assert_eq!(store.ttl_remaining("key").await.unwrap(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_ttl_rounds_to_nearest_second() {
    let (store, clock) = store();
    store.set_with_ttl("key", "value", 10).await.unwrap();

    clock.advance(Duration::milliseconds(400));
    assert_eq!(store.ttl_remaining("key").await.unwrap(), 10);

    clock.advance(Duration::milliseconds(200));
    assert_eq!(store.ttl_remaining("key").await.unwrap(), 9);
}

#[tokio::test]
async fn test_huge_ttl_does_not_overflow() {
    let (store, _) = store();

    store.set_with_ttl("key", "value", u64::MAX).await.unwrap();

    assert_eq!(store.get("key").await.unwrap(), Some("value".to_string()));
}

#[tokio::test]
async fn test_overwrite_resets_ttl() {
    let (store, clock) = store();
    store.set_with_ttl("key", "first", 60).await.unwrap();
    clock.advance(Duration::seconds(30));

    store.set_with_ttl("key", "second", 60).await.unwrap();

    assert_eq!(store.get("key").await.unwrap(), Some("second".to_string()));
    assert_eq!(store.ttl_remaining("key").await.unwrap(), 60);
}

#[tokio::test]
async fn test_delete() {
    let (store, _) = store();
    store.set_with_ttl("key", "value", 60).await.unwrap();

    assert!(store.delete("key").await.unwrap());
    assert!(!store.delete("key").await.unwrap());
    assert_eq!(store.get("key").await.unwrap(), None);
}

#[tokio::test]
async fn test_increment_creates_persistent_counter() {
    let (store, _) = store();

    assert_eq!(store.increment("counter").await.unwrap(), 1);
    assert_eq!(store.increment("counter").await.unwrap(), 2);

    // No implicit expiry
    assert_eq!(store.ttl_remaining("counter").await.unwrap(), 0);
    assert_eq!(store.get("counter").await.unwrap(), Some("2".to_string()));
}

#[tokio::test]
async fn test_increment_rejects_non_integer() {
    let (store, _) = store();
    store.set_with_ttl("key", "abc", 60).await.unwrap();

    let result = store.increment("key").await;

    assert!(matches!(result, Err(DomainError::Store { .. })));
}

#[tokio::test]
async fn test_expire_at() {
    let (store, clock) = store();
    store.increment("counter").await.unwrap();

    let at = clock.now() + Duration::seconds(90);
    store.expire_at("counter", at).await.unwrap();
    assert_eq!(store.ttl_remaining("counter").await.unwrap(), 90);

    clock.advance(Duration::seconds(90));
    assert_eq!(store.get("counter").await.unwrap(), None);
}

#[tokio::test]
async fn test_expire_at_in_the_past_deletes() {
    let (store, clock) = store();
    store.set_with_ttl("key", "value", 60).await.unwrap();

    store
        .expire_at("key", clock.now() - Duration::seconds(1))
        .await
        .unwrap();

    assert_eq!(store.get("key").await.unwrap(), None);
}

#[tokio::test]
async fn test_expire_at_missing_key_is_noop() {
    let (store, clock) = store();

    store
        .expire_at("missing", clock.now() + Duration::seconds(10))
        .await
        .unwrap();

    assert!(store.is_empty());
}

#[tokio::test]
async fn test_set_members() {
    let (store, _) = store();

    store.set_add("set", "123456").await.unwrap();
    store.set_add("set", "654321").await.unwrap();
    store.set_add("set", "123456").await.unwrap();
    assert_eq!(store.set_cardinality("set").await.unwrap(), 2);

    store.set_remove("set", "123456").await.unwrap();
    store.set_remove("set", "not-a-member").await.unwrap();
    assert_eq!(store.set_cardinality("set").await.unwrap(), 1);
}

#[tokio::test]
async fn test_empty_set_is_removed() {
    let (store, _) = store();
    store.set_add("set", "123456").await.unwrap();

    store.set_remove("set", "123456").await.unwrap();

    assert_eq!(store.set_cardinality("set").await.unwrap(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_set_remove_on_missing_key() {
    let (store, _) = store();

    store.set_remove("missing", "123456").await.unwrap();

    assert_eq!(store.set_cardinality("missing").await.unwrap(), 0);
}

#[tokio::test]
async fn test_wrong_type_errors() {
    let (store, _) = store();
    store.set_with_ttl("text", "value", 60).await.unwrap();
    store.set_add("set", "member").await.unwrap();

    assert!(matches!(store.set_add("text", "m").await, Err(DomainError::Store { .. })));
    assert!(matches!(store.set_cardinality("text").await, Err(DomainError::Store { .. })));
    assert!(matches!(store.get("set").await, Err(DomainError::Store { .. })));
    assert!(matches!(store.increment("set").await, Err(DomainError::Store { .. })));
}

#[tokio::test]
async fn test_expired_set_can_be_recreated() {
    let (store, clock) = store();
    store.set_add("set", "a").await.unwrap();
    store
        .expire_at("set", clock.now() + Duration::seconds(5))
        .await
        .unwrap();

    clock.advance(Duration::seconds(5));
    store.set_add("set", "b").await.unwrap();

    assert_eq!(store.set_cardinality("set").await.unwrap(), 1);
    assert_eq!(store.ttl_remaining("set").await.unwrap(), 0);
}
