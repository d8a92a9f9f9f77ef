//! Shared domain types for credential lookup and principal resolution.
//!
//! This module defines the records that flow between the credential store,
//! the principal resolver, and the authentication layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque reference to the subject (user identity) a credential belongs to.
///
/// Wraps a raw `String` identifier to prevent accidental misuse — passing an
/// API key where a subject identifier is expected is a compile-time error.
/// The value is opaque to this crate; its structure is owned by whatever
/// system issues identities.
///
/// # Examples
///
/// ```
/// use keygate_credentials::SubjectId;
///
/// let subject = SubjectId::from("u1");
/// assert_eq!(subject.as_str(), "u1");
/// assert_eq!(subject.to_string(), "u1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single permission record in a subject's effective permission set.
///
/// Opaque to the authentication core: permissions are produced by the
/// [`PrincipalResolver`](crate::resolver::PrincipalResolver) and cached
/// verbatim. How they are computed or aggregated is out of scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Permission name, e.g. `"read"` or `"reports:export"`.
    pub name: String,
}

impl Permission {
    /// Creates a permission with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Durable credential record owned by the credential store.
///
/// Maps an opaque API key to a subject and a validity window. A record whose
/// `valid_until` is in the past belongs to a caller that legitimately held a
/// key — the authentication layer distinguishes this (Forbidden) from an
/// unknown key (Unauthorized).
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use keygate_credentials::CredentialRecord;
///
/// let record = CredentialRecord::builder()
///     .subject("u1")
///     .valid_until(Utc::now() + Duration::days(30))
///     .build();
///
/// assert!(!record.is_expired());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct CredentialRecord {
    /// Subject this credential authenticates as.
    #[builder(into)]
    pub subject: SubjectId,

    /// When the credential stops being valid.
    ///
    /// Validation compares against wall-clock time at request time; a record
    /// with `valid_until <= now` is expired but still known.
    pub valid_until: DateTime<Utc>,

    /// When the credential record was created.
    ///
    /// Set once at creation and never changes.
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Returns `true` if the credential's validity window has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.valid_until <= Utc::now()
    }
}

/// Identity plus effective permission set, as cached by the authentication
/// layer.
///
/// Produced only by the [`PrincipalResolver`](crate::resolver::PrincipalResolver)
/// and cached verbatim; the permission ordering the resolver returned is
/// preserved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedPrincipal {
    /// The authenticated subject.
    pub identity: SubjectId,

    /// Effective permission set, in resolver order.
    pub permissions: Vec<Permission>,
}

impl CachedPrincipal {
    /// Creates a principal from an identity and its resolved permissions.
    #[must_use]
    pub fn new(identity: impl Into<SubjectId>, permissions: Vec<Permission>) -> Self {
        Self { identity: identity.into(), permissions }
    }
}
