//! Encrypted, time-bounded principal cache.
//!
//! This module provides [`PrincipalCache`], which keeps recently
//! authenticated principals in memory so the request path avoids a credential
//! store round trip on every request.
//!
//! # Architecture
//!
//! ```text
//! request arrives → gate extracts key
//!                 → cache get (decrypt on hit)
//!                 → miss? credential store lookup → resolver
//!                 → cache put (sealed under the process key)
//! ```
//!
//! # Encryption at rest
//!
//! Every cached principal is sealed with a process-lifetime AES-256-GCM key
//! owned by the cache (see [`Cipher`]). A restart silently invalidates every
//! entry: old payloads can no longer be opened, and the credential store
//! remains the source of truth.
//!
//! # Eviction
//!
//! - **Lazy**: `get` on an expired entry removes it and reports a miss.
//! - **Active**: a background sweep task removes all expired entries on a fixed
//!   interval (default 5 minutes), so keys that are never looked up again do
//!   not leak memory.
//!
//! # Concurrency
//!
//! The entry table is a [`parking_lot::RwLock`] map: reads proceed
//! concurrently; every mutation (`put`, lazy eviction, sweep) serializes
//! through the write lock. The encryption key is created once and never
//! mutated, so it needs no lock at all.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use bytes::Bytes;
use keygate_credentials::CachedPrincipal;
use parking_lot::RwLock;
use tokio::{select, sync::watch, time::sleep};

use crate::cipher::{Cipher, CipherError};

/// Default time-to-live for a cached principal (1 hour).
///
/// This balances security (revoked or changed permissions propagate within
/// this window) with performance (reduces credential store round trips).
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(3600);

/// Default interval between background sweep cycles (5 minutes).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Tuning knobs for [`PrincipalCache`].
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    /// Time-to-live applied by [`PrincipalCache::put_default`].
    pub entry_ttl: Duration,
    /// Interval between background sweep cycles.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { entry_ttl: DEFAULT_ENTRY_TTL, sweep_interval: DEFAULT_SWEEP_INTERVAL }
    }
}

/// Outcome of a cache lookup.
///
/// A `Miss` covers both "never stored" and "stored but expired" — the two are
/// indistinguishable to callers by design. Decryption failures are *not*
/// misses; they surface as errors so the caller can fail closed.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    /// The key mapped to a live entry that decrypted and decoded cleanly.
    Hit(CachedPrincipal),
    /// The key is absent (or expired, which is logically the same thing).
    Miss,
}

/// One sealed entry: AEAD output plus its absolute expiry.
struct CacheEntry {
    sealed: Bytes,
    expires_at: Instant,
}

/// Counters for cache observability.
#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_evictions: AtomicU64,
    decrypt_failures: AtomicU64,
    sweep_runs: AtomicU64,
    sweep_evictions: AtomicU64,
}

/// Snapshot of cache metrics at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    /// Lookups that returned a live, decryptable entry.
    pub hits: u64,
    /// Lookups that found no live entry (absent or expired).
    pub misses: u64,
    /// Expired entries removed lazily by `get`.
    pub expired_evictions: u64,
    /// Lookups that failed to decrypt or decode (entry left in place).
    pub decrypt_failures: u64,
    /// Completed sweep cycles.
    pub sweep_runs: u64,
    /// Expired entries removed by sweeps.
    pub sweep_evictions: u64,
}

/// Holds the shutdown signal sender. When dropped, the watch channel
/// closes and the sweep task exits.
struct ShutdownGuard {
    shutdown_tx: watch::Sender<()>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        // Sending is a best-effort signal; the receiver may already be gone.
        let _ = self.shutdown_tx.send(());
    }
}

/// Concurrently readable table of sealed principals keyed by raw API key.
///
/// # Cloning
///
/// `PrincipalCache` is cheaply cloneable via [`Arc`]. All clones share the
/// same table, encryption key, and counters.
///
/// # Shutdown
///
/// The background sweep task stops automatically when all clones are dropped
/// (via the internal `ShutdownGuard`). Call [`shutdown`](Self::shutdown) for
/// deterministic shutdown timing in tests.
#[derive(Clone)]
pub struct PrincipalCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    cipher: Arc<Cipher>,
    config: CacheConfig,
    counters: Arc<CacheCounters>,
    shutdown_guard: Arc<ShutdownGuard>,
}

impl PrincipalCache {
    /// Creates a cache with default configuration and a fresh process key.
    ///
    /// Spawns the background sweep task; must be called within a Tokio
    /// runtime context.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with the given configuration and a fresh process key.
    ///
    /// # Panics
    ///
    /// Must be called within a Tokio runtime context (the sweep task is
    /// spawned here).
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let cache = Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            cipher: Arc::new(Cipher::generate()),
            config,
            counters: Arc::new(CacheCounters::default()),
            shutdown_guard: Arc::new(ShutdownGuard { shutdown_tx }),
        };

        // The task must not hold a full cache clone: that would keep the
        // shutdown guard alive and the task would never observe shutdown.
        let entries = Arc::clone(&cache.entries);
        let counters = Arc::clone(&cache.counters);
        let interval = config.sweep_interval;
        tokio::spawn(async move {
            run_sweep_task(entries, counters, interval, shutdown_rx).await;
        });

        cache
    }

    /// Seals `value` and stores it under `key` with the given time-to-live.
    ///
    /// Overwriting an existing key is last-write-wins: both the payload and
    /// the expiry are replaced.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::SealFailure`] if the principal cannot be
    /// encoded or encrypted. The table is unchanged on error.
    pub fn put(
        &self,
        key: impl Into<String>,
        value: &CachedPrincipal,
        ttl: Duration,
    ) -> Result<(), CipherError> {
        let plaintext = serde_json::to_vec(value)
            .map_err(|e| CipherError::seal_failure(format!("principal encode: {e}")))?;
        let sealed = self.cipher.seal(&plaintext)?;
        let expires_at = Instant::now() + ttl;

        let mut entries = self.entries.write();
        entries.insert(key.into(), CacheEntry { sealed, expires_at });
        Ok(())
    }

    /// [`put`](Self::put) with the configured default TTL (1 hour unless
    /// overridden via [`CacheConfig`]).
    pub fn put_default(
        &self,
        key: impl Into<String>,
        value: &CachedPrincipal,
    ) -> Result<(), CipherError> {
        self.put(key, value, self.config.entry_ttl)
    }

    /// Looks up `key`, decrypting the stored principal on a live hit.
    ///
    /// An expired entry is evicted immediately (lazy eviction) and reported
    /// as a [`Lookup::Miss`].
    ///
    /// # Errors
    ///
    /// Propagates the [`CipherError`] kind if the sealed payload fails tag
    /// verification or the decrypted bytes do not decode into a principal.
    /// The entry is **not** evicted on error — the cause may be a transient
    /// in-process bug rather than a stale row, and eviction would hide the
    /// signal (see DESIGN notes).
    pub fn get(&self, key: &str) -> Result<Lookup, CipherError> {
        let now = Instant::now();

        let sealed = {
            let entries = self.entries.read();
            match entries.get(key) {
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    return Ok(Lookup::Miss);
                },
                Some(entry) if entry.expires_at <= now => None,
                Some(entry) => Some(entry.sealed.clone()),
            }
        };

        let Some(sealed) = sealed else {
            // Lazy eviction. Re-check expiry under the write lock: a racing
            // put may have refreshed this key between the two lock scopes,
            // and a refreshed entry must survive.
            let mut entries = self.entries.write();
            if entries.get(key).is_some_and(|entry| entry.expires_at <= Instant::now()) {
                entries.remove(key);
                self.counters.expired_evictions.fetch_add(1, Ordering::Relaxed);
            }
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(Lookup::Miss);
        };

        let plaintext = match self.cipher.open(&sealed) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                self.counters.decrypt_failures.fetch_add(1, Ordering::Relaxed);
                return Err(err);
            },
        };

        let principal: CachedPrincipal = match serde_json::from_slice(&plaintext) {
            Ok(principal) => principal,
            Err(err) => {
                self.counters.decrypt_failures.fetch_add(1, Ordering::Relaxed);
                return Err(CipherError::malformed_payload(format!("principal decode: {err}")));
            },
        };

        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Lookup::Hit(principal))
    }

    /// Removes every entry whose expiry has passed, returning how many were
    /// evicted.
    ///
    /// Invoked by the internal timer on a fixed interval; also callable
    /// directly. Sweep mutations serialize with `put` and lazy eviction
    /// through the same write lock.
    pub fn sweep(&self) -> usize {
        sweep_expired(&self.entries, &self.counters)
    }

    /// Removes every entry, live or expired.
    ///
    /// Use sparingly — this causes a spike in credential store lookups. An
    /// audit event is emitted at INFO level for compliance tracking.
    pub fn clear_all(&self) {
        let evicted = {
            let mut entries = self.entries.write();
            let count = entries.len();
            entries.clear();
            count
        };
        tracing::info!(
            audit.action = "clear_cache",
            audit.resource = "all_principals",
            audit.result = "success",
            audit.evicted = evicted,
            "audit_event"
        );
    }

    /// Signals the background sweep task to stop.
    ///
    /// Optional — the task also stops when all clones are dropped. Use this
    /// when you need deterministic shutdown timing (e.g., in tests).
    pub fn shutdown(&self) {
        let _ = self.shutdown_guard.shutdown_tx.send(());
    }

    /// Returns the number of physically present entries, expired or not.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if an entry is physically present for `key`, expired
    /// or not.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns a point-in-time snapshot of the cache counters.
    #[must_use]
    pub fn metrics(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expired_evictions: self.counters.expired_evictions.load(Ordering::Relaxed),
            decrypt_failures: self.counters.decrypt_failures.load(Ordering::Relaxed),
            sweep_runs: self.counters.sweep_runs.load(Ordering::Relaxed),
            sweep_evictions: self.counters.sweep_evictions.load(Ordering::Relaxed),
        }
    }

    /// Flips one byte of the sealed payload stored for `key`, returning
    /// `true` if an entry was present.
    ///
    /// Used by tamper-detection tests to simulate in-memory corruption.
    #[cfg(any(test, feature = "testutil"))]
    pub fn corrupt_entry(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) => {
                let mut bytes = entry.sealed.to_vec();
                if let Some(last) = bytes.last_mut() {
                    *last ^= 0x01;
                }
                entry.sealed = Bytes::from(bytes);
                true
            },
            None => false,
        }
    }
}

/// Shared eviction pass used by both [`PrincipalCache::sweep`] and the
/// background task.
fn sweep_expired(
    entries: &RwLock<HashMap<String, CacheEntry>>,
    counters: &CacheCounters,
) -> usize {
    let now = Instant::now();
    let evicted = {
        let mut entries = entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    };

    counters.sweep_runs.fetch_add(1, Ordering::Relaxed);
    counters.sweep_evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    if evicted > 0 {
        tracing::debug!(evicted, "sweep removed expired entries");
    }
    evicted
}

/// Background loop: sweep expired entries every `interval`.
///
/// Exits when the shutdown signal is received, either explicitly via
/// [`PrincipalCache::shutdown`] or implicitly when the last cache clone (and
/// with it the watch sender) is dropped.
async fn run_sweep_task(
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    counters: Arc<CacheCounters>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    loop {
        select! {
            _ = sleep(interval) => {}
            _ = shutdown_rx.changed() => {
                tracing::debug!("principal cache sweep task shutting down");
                return;
            }
        }
        sweep_expired(&entries, &counters);
    }
}

impl Default for PrincipalCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrincipalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalCache")
            .field("entries", &self.entry_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use keygate_credentials::Permission;

    use super::*;

    fn make_principal(identity: &str) -> CachedPrincipal {
        CachedPrincipal::new(identity, vec![Permission::new("read")])
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let cache = PrincipalCache::new();
        let principal = make_principal("u1");

        cache.put("key-1", &principal, Duration::from_secs(60)).expect("put");
        let lookup = cache.get("key-1").expect("get");

        assert_eq!(lookup, Lookup::Hit(principal));
    }

    #[tokio::test]
    async fn test_get_absent_key_is_miss() {
        let cache = PrincipalCache::new();

        let lookup = cache.get("never-stored").expect("get");

        assert_eq!(lookup, Lookup::Miss);
        assert_eq!(cache.metrics().misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_and_evicted() {
        let cache = PrincipalCache::new();
        cache.put("short", &make_principal("u1"), Duration::from_millis(100)).expect("put");

        tokio::time::sleep(Duration::from_millis(150)).await;

        let lookup = cache.get("short").expect("get");
        assert_eq!(lookup, Lookup::Miss);
        assert!(!cache.contains_key("short"), "lazy eviction should remove the expired entry");
        assert_eq!(cache.metrics().expired_evictions, 1);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = PrincipalCache::new();
        let first = make_principal("u1");
        let second = make_principal("u2");

        cache.put("key", &first, Duration::from_secs(3600)).expect("first put");
        cache.put("key", &second, Duration::from_secs(3600)).expect("second put");

        let lookup = cache.get("key").expect("get");
        assert_eq!(lookup, Lookup::Hit(second));
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_without_get() {
        let cache = PrincipalCache::new();
        cache.put("stale", &make_principal("u1"), Duration::from_millis(50)).expect("put");
        cache.put("live", &make_principal("u2"), Duration::from_secs(3600)).expect("put");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.entry_count(), 2, "expired entry lingers until sweep");

        let evicted = cache.sweep();

        assert_eq!(evicted, 1);
        assert!(!cache.contains_key("stale"));
        assert!(cache.contains_key("live"));
    }

    #[tokio::test]
    async fn test_background_sweep_runs_on_interval() {
        let cache = PrincipalCache::with_config(CacheConfig {
            entry_ttl: DEFAULT_ENTRY_TTL,
            sweep_interval: Duration::from_millis(100),
        });
        cache.put("stale", &make_principal("u1"), Duration::from_millis(20)).expect("put");

        // Wait for the entry to expire and the sweep task to fire at least once.
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(!cache.contains_key("stale"), "background sweep should have evicted the entry");
        assert!(cache.metrics().sweep_runs >= 1);
    }

    #[tokio::test]
    async fn test_corrupted_entry_surfaces_tag_mismatch_without_eviction() {
        let cache = PrincipalCache::new();
        cache.put("key", &make_principal("u1"), Duration::from_secs(3600)).expect("put");

        assert!(cache.corrupt_entry("key"));

        let result = cache.get("key");
        assert!(matches!(result, Err(CipherError::AuthenticationTagMismatch)));
        assert!(cache.contains_key("key"), "decryption failure must not evict");
        assert_eq!(cache.metrics().decrypt_failures, 1);

        // The corruption persists: a second read reproduces the error.
        let again = cache.get("key");
        assert!(matches!(again, Err(CipherError::AuthenticationTagMismatch)));
    }

    #[tokio::test]
    async fn test_put_refreshes_expiry() {
        let cache = PrincipalCache::new();
        let principal = make_principal("u1");

        cache.put("key", &principal, Duration::from_millis(50)).expect("put");
        cache.put("key", &principal, Duration::from_secs(3600)).expect("refresh");

        tokio::time::sleep(Duration::from_millis(100)).await;

        let lookup = cache.get("key").expect("get");
        assert_eq!(lookup, Lookup::Hit(principal), "refreshed TTL should keep the entry alive");
    }

    #[tokio::test]
    async fn test_clear_all_empties_table() {
        let cache = PrincipalCache::new();
        cache.put("a", &make_principal("u1"), Duration::from_secs(60)).expect("put");
        cache.put("b", &make_principal("u2"), Duration::from_secs(60)).expect("put");

        cache.clear_all();

        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_clone_shares_entries() {
        let cache = PrincipalCache::new();
        let cloned = cache.clone();

        cache.put("shared", &make_principal("u1"), Duration::from_secs(60)).expect("put");

        let lookup = cloned.get("shared").expect("get via clone");
        assert!(matches!(lookup, Lookup::Hit(_)));
    }

    #[tokio::test]
    async fn test_concurrent_puts_and_gets() {
        let cache = PrincipalCache::new();
        let mut handles = Vec::new();

        for task in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for seq in 0..50 {
                    let key = format!("key-{}", seq % 10);
                    let principal = make_principal(&format!("u{task}-{seq}"));
                    cache.put(&key, &principal, Duration::from_secs(60)).expect("put");
                    // Every get must be a clean hit or miss; decryption can
                    // never fail under concurrent overwrites.
                    cache.get(&key).expect("get must not surface a cipher error");
                }
            }));
        }

        for handle in handles {
            handle.await.expect("task");
        }

        assert_eq!(cache.entry_count(), 10);
    }
}
