//! In-memory store implementation
//!
//! Mirrors the Redis semantics the verification services rely on (lazy
//! expiry, `INCR` on missing keys, empty sets disappearing) so it can stand in
//! for Redis in development and tests. Expiry is measured with the injected
//! [`Clock`], which lets tests move time forward deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use tracing::debug;

use crate::errors::{DomainError, DomainResult};

use super::clock::{Clock, SystemClock};
use super::traits::VerificationStore;

/// Longest expiry representable as a chrono duration
const MAX_TTL_SECONDS: i64 = i64::MAX / 1000;

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Members(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Option<DateTime<Local>>,
}

/// Thread-safe in-memory key-value store with per-key expiry
#[derive(Debug)]
pub struct MemoryStore<C: Clock = SystemClock> {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<C>,
}

impl MemoryStore<SystemClock> {
    /// Create a store driven by the wall clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    /// Create a store driven by `clock`
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.lock()
            .values()
            .filter(|entry| !is_expired(entry, &now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the map with `key` purged if it has expired
    fn lock_live(&self, key: &str) -> MutexGuard<'_, HashMap<String, Entry>> {
        let now = self.clock.now();
        let mut entries = self.lock();
        if entries.get(key).is_some_and(|entry| is_expired(entry, &now)) {
            entries.remove(key);
        }
        entries
    }
}

fn is_expired(entry: &Entry, now: &DateTime<Local>) -> bool {
    entry.expires_at.is_some_and(|at| at <= *now)
}

fn wrong_type(key: &str) -> DomainError {
    DomainError::store(format!(
        "WRONGTYPE Operation against key '{}' holding the wrong kind of value",
        key
    ))
}

#[async_trait]
impl<C: Clock> VerificationStore for MemoryStore<C> {
    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: u64) -> DomainResult<()> {
        debug!("Setting key '{}' with expiry {}s", key, ttl_seconds);
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX).min(MAX_TTL_SECONDS);
        let expires_at = self.clock.now().checked_add_signed(Duration::seconds(ttl));
        self.lock().insert(
            key.to_string(),
            Entry {
                value: StoredValue::Text(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        match self.lock_live(key).get(key) {
            None => Ok(None),
            Some(Entry {
                value: StoredValue::Text(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn delete(&self, key: &str) -> DomainResult<bool> {
        Ok(self.lock_live(key).remove(key).is_some())
    }

    async fn ttl_remaining(&self, key: &str) -> DomainResult<u64> {
        let now = self.clock.now();
        let entries = self.lock_live(key);
        let Some(expires_at) = entries.get(key).and_then(|entry| entry.expires_at) else {
            return Ok(0);
        };
        // Rounded to the nearest second, like Redis TTL
        let millis = (expires_at - now).num_milliseconds();
        Ok(u64::try_from((millis + 500) / 1000).unwrap_or(0))
    }

    async fn increment(&self, key: &str) -> DomainResult<i64> {
        let mut entries = self.lock_live(key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: StoredValue::Text("0".to_string()),
            expires_at: None,
        });
        let StoredValue::Text(current) = &entry.value else {
            return Err(wrong_type(key));
        };
        let next = current
            .parse::<i64>()
            .map_err(|_| DomainError::store(format!("value at '{}' is not an integer", key)))?
            .checked_add(1)
            .ok_or_else(|| DomainError::store(format!("increment at '{}' would overflow", key)))?;
        entry.value = StoredValue::Text(next.to_string());
        Ok(next)
    }

    async fn expire_at(&self, key: &str, at: DateTime<Local>) -> DomainResult<()> {
        let now = self.clock.now();
        let mut entries = self.lock_live(key);
        if at <= now {
            entries.remove(key);
        } else if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(at);
        }
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> DomainResult<()> {
        let mut entries = self.lock_live(key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: StoredValue::Members(HashSet::new()),
            expires_at: None,
        });
        match &mut entry.value {
            StoredValue::Members(members) => {
                members.insert(member.to_string());
                Ok(())
            }
            StoredValue::Text(_) => Err(wrong_type(key)),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> DomainResult<()> {
        let mut entries = self.lock_live(key);
        let now_empty = match entries.get_mut(key) {
            None => return Ok(()),
            Some(Entry {
                value: StoredValue::Members(members),
                ..
            }) => {
                members.remove(member);
                members.is_empty()
            }
            Some(_) => return Err(wrong_type(key)),
        };
        if now_empty {
            entries.remove(key);
        }
        Ok(())
    }

    async fn set_cardinality(&self, key: &str) -> DomainResult<u64> {
        match self.lock_live(key).get(key) {
            None => Ok(0),
            Some(Entry {
                value: StoredValue::Members(members),
                ..
            }) => Ok(members.len() as u64),
            Some(_) => Err(wrong_type(key)),
        }
    }
}
