//! # Infrastructure Layer
//!
//! This crate wires the verification code domain to Redis. It provides the
//! Redis client, the [`cache::RedisVerificationStore`] adapter, and
//! configuration loading from the environment (with `.env` support).
//!
//! ## Architecture
//!
//! - **Cache**: Redis client and the store adapter built on it
//! - **Config**: cache and verification policy settings from the environment

use std::sync::Arc;

use vc_core::domain::entities::VerificationPolicy;
use vc_core::domain::value_objects::KeySpace;
use vc_core::services::VerificationCodeService;

// Re-export core types for convenience
pub use vc_core::errors::*;

/// Cache module - Redis client and store adapter
pub mod cache;

use cache::{RedisClient, RedisVerificationStore};

/// Configuration module for infrastructure services
pub mod config {
    //! Configuration management for infrastructure services
    //!
    //! Handles:
    //! - Redis connection settings
    //! - Verification policy thresholds and namespace

    pub use vc_shared::config::{CacheConfig, VerificationConfig};

    /// Infrastructure configuration settings
    #[derive(Debug, Clone, Default)]
    pub struct InfrastructureConfig {
        /// Redis cache configuration
        pub cache: CacheConfig,
        /// Verification code policy
        pub verification: VerificationConfig,
    }
}

/// Verification service running on Redis
pub type RedisVerificationService = VerificationCodeService<RedisVerificationStore>;

/// Initialize the verification service from the environment
///
/// This function:
/// - Loads configuration (`.env` file first, then process environment)
/// - Connects to Redis with the configured retry policy
/// - Builds the policy and the verification service
pub async fn initialize() -> Result<RedisVerificationService, InfrastructureError> {
    tracing::info!("Initializing infrastructure services...");

    let config = load_config()?;
    let service = build_service(&config).await?;

    tracing::info!(
        namespace = service.namespace(),
        "Infrastructure services initialized successfully"
    );
    Ok(service)
}

/// Build the verification service for an explicit configuration
///
/// The namespace and policy are validated before any connection is made.
pub async fn build_service(
    config: &config::InfrastructureConfig,
) -> Result<RedisVerificationService, InfrastructureError> {
    KeySpace::new(config.verification.namespace.as_str())?;
    let policy = VerificationPolicy::from_config(&config.verification)?;

    let client = RedisClient::new(config.cache.clone()).await?;
    let store = Arc::new(RedisVerificationStore::new(client));

    Ok(VerificationCodeService::new(store, config.verification.namespace.clone(), Arc::new(policy)).await?)
}

/// Load infrastructure configuration from environment
pub fn load_config() -> Result<config::InfrastructureConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    let cache = config::CacheConfig::from_env();
    let verification = config::VerificationConfig::from_env().map_err(InfrastructureError::Config)?;

    Ok(config::InfrastructureConfig {
        cache,
        verification,
    })
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by the verification domain, such as a failed store ping
    #[error(transparent)]
    Domain(DomainError),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}

impl From<DomainError> for InfrastructureError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidConfig { message } => InfrastructureError::Config(message),
            other => InfrastructureError::Domain(other),
        }
    }
}

impl From<InfrastructureError> for DomainError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Cache(e) => DomainError::store(e.to_string()),
            InfrastructureError::Config(message) => DomainError::InvalidConfig { message },
            InfrastructureError::Domain(err) => err,
            InfrastructureError::General(message) => DomainError::Internal { message },
        }
    }
}
