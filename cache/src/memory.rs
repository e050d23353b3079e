//! In-process TTL cache backend.
//!
//! Expiry is lazy: entries are checked against `now` on every access, and
//! [`TtlCache::purge_expired`] sweeps the rest; the engine drives it from
//! each token rotation tick, standing in for the timer-based eviction a
//! distributed backend does natively.

use crate::{CacheError, SetAdd, TtlCache};
use rollcall_types::Timestamp;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::trace;

enum Value {
    Bytes(Vec<u8>),
    Set(HashSet<String>),
}

struct Entry {
    value: Value,
    expires_at: Timestamp,
}

impl Entry {
    fn is_live(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// Mutex-guarded map with per-entry expiry.
#[derive(Default)]
pub struct MemoryTtlCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryTtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, live or not.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TtlCache for MemoryTtlCache {
    fn purge_expired(&self, now: Timestamp) -> Result<usize, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        let removed = before - entries.len();
        if removed > 0 {
            trace!(removed, "purged expired cache entries");
        }
        Ok(removed)
    }

    fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl_secs: u64,
        now: Timestamp,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Bytes(value),
                expires_at: now.add_secs(ttl_secs),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str, now: Timestamp) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => match &entry.value {
                Value::Bytes(bytes) => Ok(Some(bytes.clone())),
                Value::Set(_) => Ok(None),
            },
            Some(_) => {
                // Lazy eviction on read.
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn add_to_set(
        &self,
        key: &str,
        member: &str,
        ttl_secs: u64,
        now: Timestamp,
    ) -> Result<SetAdd, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;

        // Expired sets behave as absent: the add recreates them fresh.
        let recreate = match entries.get(key) {
            Some(entry) => !entry.is_live(now),
            None => true,
        };

        if recreate {
            let mut set = HashSet::new();
            set.insert(member.to_string());
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Set(set),
                    expires_at: now.add_secs(ttl_secs),
                },
            );
            return Ok(SetAdd::Added);
        }

        let entry = entries.get_mut(key).expect("entry checked live above");
        match &mut entry.value {
            Value::Set(set) => {
                if set.insert(member.to_string()) {
                    Ok(SetAdd::Added)
                } else {
                    Ok(SetAdd::AlreadyPresent)
                }
            }
            Value::Bytes(_) => Err(CacheError::Backend(format!(
                "key {key} holds bytes, not a set"
            ))),
        }
    }
}
