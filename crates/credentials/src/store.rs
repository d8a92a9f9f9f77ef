//! Credential store trait and in-memory implementation.
//!
//! The [`CredentialStore`] trait abstracts the durable mapping from opaque
//! API keys to [`CredentialRecord`]s. Production deployments back it with a
//! relational store; tests and development use [`MemoryCredentialStore`].
//!
//! # Usage
//!
//! ```
//! use chrono::{Duration, Utc};
//! use keygate_credentials::{CredentialRecord, CredentialStore, MemoryCredentialStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryCredentialStore::new();
//!
//!     let record = CredentialRecord::builder()
//!         .subject("u1")
//!         .valid_until(Utc::now() + Duration::days(30))
//!         .build();
//!     store.create_credential("abc123", record);
//!
//!     let found = store.lookup_by_key("abc123").await?;
//!     assert!(found.is_some());
//!
//!     let missing = store.lookup_by_key("nope").await?;
//!     assert!(missing.is_none());
//!     Ok(())
//! }
//! ```

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{error::CredentialResult, types::CredentialRecord};

/// Durable lookup of API keys.
///
/// The raw key is opaque and compared by exact byte equality. An unknown key
/// is a defined outcome (`Ok(None)`), not an error; errors are reserved for
/// backend failures.
///
/// Implementations must never log the raw key in clear text.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up the credential record for a raw API key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if the key is known (the record may still be expired)
    /// - `Ok(None)` if the key is unknown
    /// - `Err(...)` on backend failures
    async fn lookup_by_key(&self, raw_key: &str) -> CredentialResult<Option<CredentialRecord>>;
}

/// In-memory implementation of [`CredentialStore`] for testing and
/// development.
///
/// Stores records in a thread-safe hash map. Data is not persisted between
/// restarts.
///
/// # Cloning
///
/// `MemoryCredentialStore` is cheaply cloneable via [`Arc`]; all clones share
/// the same underlying records and lookup counter.
///
/// # Lookup counting
///
/// Every `lookup_by_key` call increments a counter readable via
/// [`lookup_count`](Self::lookup_count). Tests use this to assert that a
/// cached authentication does not hit the store a second time.
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    records: Arc<RwLock<HashMap<String, CredentialRecord>>>,
    lookups: Arc<AtomicU64>,
}

impl MemoryCredentialStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for a raw key.
    pub fn create_credential(&self, raw_key: impl Into<String>, record: CredentialRecord) {
        self.records.write().insert(raw_key.into(), record);
    }

    /// Removes the record for a raw key, returning it if present.
    pub fn remove_credential(&self, raw_key: &str) -> Option<CredentialRecord> {
        self.records.write().remove(raw_key)
    }

    /// Returns how many `lookup_by_key` calls this store has served.
    #[must_use]
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    #[tracing::instrument(skip(self, raw_key))]
    async fn lookup_by_key(&self, raw_key: &str) -> CredentialResult<Option<CredentialRecord>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let records = self.records.read();
        Ok(records.get(raw_key).cloned())
    }
}
