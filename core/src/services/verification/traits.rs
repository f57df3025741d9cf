//! Trait for key-value store integration

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::errors::DomainResult;

/// Key-value store contract used by the verification services
///
/// Every method is a point operation on one key. Implementations must be
/// safe for concurrent use and report backend failures as
/// [`DomainError::Store`](crate::errors::DomainError::Store). Absent keys are
/// never an error.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Probe connectivity
    async fn ping(&self) -> DomainResult<()>;

    /// Set a scalar value that expires after `ttl_seconds`
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> DomainResult<()>;

    /// Get a scalar value, `None` if absent or expired
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> DomainResult<bool>;

    /// Remaining time to live in seconds, 0 if absent, expired or persistent
    async fn ttl_remaining(&self, key: &str) -> DomainResult<u64>;

    /// Atomically increment an integer value, creating it at 1
    async fn increment(&self, key: &str) -> DomainResult<i64>;

    /// Expire a key at an absolute instant
    async fn expire_at(&self, key: &str, at: DateTime<Local>) -> DomainResult<()>;

    /// Add a member to a set
    async fn set_add(&self, key: &str, member: &str) -> DomainResult<()>;

    /// Remove a member from a set
    async fn set_remove(&self, key: &str, member: &str) -> DomainResult<()>;

    /// Number of members in a set, 0 if absent
    async fn set_cardinality(&self, key: &str) -> DomainResult<u64>;
}
