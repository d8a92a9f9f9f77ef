//! Shared test utilities for credential and resolver stubs.
//!
//! This module provides record factories and always-failing collaborator
//! stubs for exercising failure paths. It is feature-gated behind `testutil`
//! to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! keygate-credentials = { path = "../credentials", features = ["testutil"] }
//! ```

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{
    error::{CredentialError, CredentialResult},
    resolver::PrincipalResolver,
    store::CredentialStore,
    types::{CredentialRecord, Permission, SubjectId},
};

/// Creates a credential record for `subject` that expires `days` from now.
///
/// Negative values produce an already-expired record.
#[must_use]
pub fn record_valid_for_days(subject: &str, days: i64) -> CredentialRecord {
    CredentialRecord::builder()
        .subject(subject)
        .valid_until(Utc::now() + Duration::days(days))
        .build()
}

/// Creates a credential record for `subject` that expired yesterday.
#[must_use]
pub fn expired_record(subject: &str) -> CredentialRecord {
    record_valid_for_days(subject, -1)
}

/// A [`CredentialStore`] whose every lookup fails with a connection error.
///
/// Used to verify that collaborator failures never authorize a request.
#[derive(Debug, Default, Clone)]
pub struct FailingCredentialStore;

#[async_trait]
impl CredentialStore for FailingCredentialStore {
    async fn lookup_by_key(&self, _raw_key: &str) -> CredentialResult<Option<CredentialRecord>> {
        Err(CredentialError::connection("credential store unreachable"))
    }
}

/// A [`PrincipalResolver`] whose every resolve fails with a timeout.
#[derive(Debug, Default, Clone)]
pub struct FailingResolver;

#[async_trait]
impl PrincipalResolver for FailingResolver {
    async fn resolve(&self, _subject: &SubjectId) -> CredentialResult<Vec<Permission>> {
        Err(CredentialError::timeout())
    }
}

/// Asserts that a [`CredentialResult`] is an `Err` matching the given
/// [`CredentialError`](crate::error::CredentialError) variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use keygate_credentials::assert_credential_error;
/// use keygate_credentials::{CredentialError, CredentialResult};
///
/// let result: CredentialResult<()> = Err(CredentialError::timeout());
/// assert_credential_error!(result, Timeout);
/// ```
#[macro_export]
macro_rules! assert_credential_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::CredentialError::$variant { .. })),
            "expected CredentialError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::CredentialError::$variant { .. })),
            "{}: expected CredentialError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
