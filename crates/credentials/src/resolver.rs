//! Principal resolver trait and in-memory implementation.
//!
//! Given a validated identity, the [`PrincipalResolver`] returns the
//! subject's effective permission set. How permissions are computed or
//! aggregated is out of scope; the authentication layer caches whatever the
//! resolver returns, verbatim and in order.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    error::CredentialResult,
    types::{Permission, SubjectId},
};

/// Resolves a subject's effective permission set.
///
/// A subject with no recorded permissions resolves to an empty set; that is a
/// defined outcome, not an error. Errors are reserved for backend failures.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Returns the ordered permission set for the given subject.
    async fn resolve(&self, subject: &SubjectId) -> CredentialResult<Vec<Permission>>;
}

/// In-memory implementation of [`PrincipalResolver`] for testing and
/// development.
///
/// # Cloning
///
/// Cheaply cloneable via [`Arc`]; all clones share the same grants and the
/// resolve counter.
#[derive(Debug, Default, Clone)]
pub struct MemoryPrincipalResolver {
    grants: Arc<RwLock<HashMap<SubjectId, Vec<Permission>>>>,
    resolves: Arc<AtomicU64>,
}

impl MemoryPrincipalResolver {
    /// Creates a new resolver with no grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the permission set for a subject, replacing any previous grants.
    pub fn grant(&self, subject: impl Into<SubjectId>, permissions: Vec<Permission>) {
        self.grants.write().insert(subject.into(), permissions);
    }

    /// Returns how many `resolve` calls this resolver has served.
    #[must_use]
    pub fn resolve_count(&self) -> u64 {
        self.resolves.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PrincipalResolver for MemoryPrincipalResolver {
    #[tracing::instrument(skip(self))]
    async fn resolve(&self, subject: &SubjectId) -> CredentialResult<Vec<Permission>> {
        self.resolves.fetch_add(1, Ordering::Relaxed);
        let grants = self.grants.read();
        Ok(grants.get(subject).cloned().unwrap_or_default())
    }
}
