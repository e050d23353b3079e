//! Ephemeral TTL key-value cache.
//!
//! The token lifecycle manager depends only on the [`TtlCache`] trait; which
//! backend is active never leaks into its code. Production deploys a
//! distributed cache behind this trait; [`MemoryTtlCache`] is the documented
//! in-process fallback, a lower-guarantee mode, since a crash mid-TTL loses
//! single-use enforcement across restarts.

pub mod error;
pub mod memory;

pub use error::CacheError;
pub use memory::MemoryTtlCache;

use rollcall_types::Timestamp;

/// Result of an atomic set-membership add.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetAdd {
    /// The member was not present and has been added.
    Added,
    /// The member was already present; nothing changed.
    AlreadyPresent,
}

/// A TTL key-value cache with an atomic set-add.
///
/// `now` is threaded explicitly: backends with native expiry may ignore it,
/// the in-memory backend uses it for lazy eviction, and tests control it.
pub trait TtlCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous entry, expiring
    /// `ttl_secs` from `now`.
    fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64, now: Timestamp)
        -> Result<(), CacheError>;

    /// Fetch the live value under `key`, or `None` if absent or expired.
    fn get(&self, key: &str, now: Timestamp) -> Result<Option<Vec<u8>>, CacheError>;

    /// Remove `key` immediately. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Atomically add `member` to the set under `key`, creating the set with
    /// `ttl_secs` if absent.
    ///
    /// This is the single read-modify-write the validate path relies on: the
    /// membership check and the insert must be indivisible, or concurrent
    /// retries by one subject could both be accepted.
    fn add_to_set(
        &self,
        key: &str,
        member: &str,
        ttl_secs: u64,
        now: Timestamp,
    ) -> Result<SetAdd, CacheError>;

    /// Eagerly drop expired entries, returning how many were removed.
    ///
    /// Backends with native expiry reclaim space themselves and keep the
    /// default no-op; the in-memory backend relies on this being called
    /// periodically, since lazy eviction never revisits keys that stop
    /// being read (each rotation's superseded consumed-set, for one).
    fn purge_expired(&self, _now: Timestamp) -> Result<usize, CacheError> {
        Ok(0)
    }
}
