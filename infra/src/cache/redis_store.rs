//! Redis-backed verification store
//!
//! Adapts [`RedisClient`] to the [`VerificationStore`] contract used by the
//! verification services. Redis errors surface as `DomainError::Store`.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use vc_core::errors::DomainResult;
use vc_core::services::VerificationStore;

use crate::cache::RedisClient;
use crate::InfrastructureError;

/// Verification state held in Redis
#[derive(Clone)]
pub struct RedisVerificationStore {
    client: RedisClient,
}

impl RedisVerificationStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }
}

#[async_trait]
impl VerificationStore for RedisVerificationStore {
    async fn ping(&self) -> DomainResult<()> {
        if self.client.health_check().await? {
            Ok(())
        } else {
            Err(InfrastructureError::Cache(redis::RedisError::from((
                redis::ErrorKind::ResponseError,
                "unexpected PING response",
            )))
            .into())
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> DomainResult<()> {
        // SET EX rejects a zero expiry
        Ok(self.client.set_with_expiry(key, value, ttl_seconds.max(1)).await?)
    }

    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.client.get(key).await?)
    }

    async fn delete(&self, key: &str) -> DomainResult<bool> {
        Ok(self.client.delete(key).await?)
    }

    async fn ttl_remaining(&self, key: &str) -> DomainResult<u64> {
        Ok(self.client.ttl(key).await?.unwrap_or(0))
    }

    async fn increment(&self, key: &str) -> DomainResult<i64> {
        Ok(self.client.increment(key).await?)
    }

    async fn expire_at(&self, key: &str, at: DateTime<Local>) -> DomainResult<()> {
        self.client.expire_at(key, at.timestamp()).await?;
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> DomainResult<()> {
        Ok(self.client.set_add(key, member).await?)
    }

    async fn set_remove(&self, key: &str, member: &str) -> DomainResult<()> {
        Ok(self.client.set_remove(key, member).await?)
    }

    async fn set_cardinality(&self, key: &str) -> DomainResult<u64> {
        Ok(self.client.set_cardinality(key).await?)
    }
}
