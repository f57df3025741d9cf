//! Verification code policy configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Verification code service settings
///
/// Every threshold uses `0` to mean "disabled" except the validity duration,
/// which must be positive. Ban rules map a failure-count threshold to a
/// temporary ban duration in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
    /// Key namespace separating business modules (e.g. "SMS", "Email")
    pub namespace: String,

    /// Lifetime of an issued code in seconds
    #[serde(default = "default_validity_seconds")]
    pub validity_seconds: i64,

    /// Minimum seconds between two code requests
    #[serde(default)]
    pub request_interval_seconds: u64,

    /// Daily ceiling of issued but unconsumed codes
    #[serde(default)]
    pub unused_code_ceiling: u32,

    /// Daily ceiling of failed verification attempts
    #[serde(default)]
    pub failure_ceiling: u32,

    /// Failure-count threshold -> ban duration (seconds)
    #[serde(default)]
    pub ban_rules: BTreeMap<u32, u64>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            namespace: String::from("SMS"),
            validity_seconds: default_validity_seconds(),
            request_interval_seconds: 60,
            unused_code_ceiling: 5,
            failure_ceiling: 10,
            ban_rules: BTreeMap::from([(3, 40), (5, 120)]),
        }
    }
}

impl VerificationConfig {
    /// Create from environment variables, falling back to defaults
    ///
    /// Fails only when a variable is present but malformed.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let namespace = std::env::var("VERIFICATION_NAMESPACE").unwrap_or(defaults.namespace);
        let validity_seconds = env_or("VERIFICATION_VALIDITY_SECONDS", defaults.validity_seconds)?;
        let request_interval_seconds = env_or(
            "VERIFICATION_REQUEST_INTERVAL_SECONDS",
            defaults.request_interval_seconds,
        )?;
        let unused_code_ceiling =
            env_or("VERIFICATION_UNUSED_CODE_CEILING", defaults.unused_code_ceiling)?;
        let failure_ceiling = env_or("VERIFICATION_FAILURE_CEILING", defaults.failure_ceiling)?;
        let ban_rules = match std::env::var("VERIFICATION_BAN_RULES") {
            Ok(raw) => parse_ban_rules(&raw)?,
            Err(_) => defaults.ban_rules,
        };

        Ok(Self {
            namespace,
            validity_seconds,
            request_interval_seconds,
            unused_code_ceiling,
            failure_ceiling,
            ban_rules,
        })
    }

    /// Create a configuration for a namespace with default thresholds
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }
}

/// Parse ban rules written as `threshold:seconds` pairs, e.g. `"3:40,5:120"`
///
/// An empty string yields an empty rule set.
pub fn parse_ban_rules(raw: &str) -> Result<BTreeMap<u32, u64>, String> {
    let mut rules = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (threshold, seconds) = pair
            .split_once(':')
            .ok_or_else(|| format!("Invalid ban rule '{}', expected threshold:seconds", pair))?;
        let threshold: u32 = threshold
            .trim()
            .parse()
            .map_err(|e| format!("Invalid ban threshold in '{}': {}", pair, e))?;
        let seconds: u64 = seconds
            .trim()
            .parse()
            .map_err(|e| format!("Invalid ban duration in '{}': {}", pair, e))?;
        rules.insert(threshold, seconds);
    }
    Ok(rules)
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Invalid value for {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

fn default_validity_seconds() -> i64 {
    300 // 5 minutes
}
