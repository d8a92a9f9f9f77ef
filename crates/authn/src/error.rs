//! Error types for the authentication gate.

use chrono::{DateTime, Utc};
use keygate_credentials::CredentialError;
use thiserror::Error;

use crate::cipher::CipherError;

/// Errors surfaced while deciding whether a request is authenticated.
///
/// Every variant collapses to a closed [`Decision`](crate::gate::Decision):
/// [`ExpiredCredential`](Self::ExpiredCredential) maps to `Forbidden`, all
/// other variants map to `Unauthorized`.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No API key was presented with the request.
    #[error("no API key presented")]
    MissingCredential,

    /// The presented API key matched no known credential.
    #[error("unknown API key")]
    UnknownCredential,

    /// The credential exists but its validity window has closed.
    #[error("credential expired at {valid_until}")]
    ExpiredCredential {
        /// When the credential stopped being valid.
        valid_until: DateTime<Utc>,
    },

    /// A cached entry failed decryption or decoding.
    #[error("cached principal is unreadable")]
    CacheCorruption(#[source] CipherError),

    /// The credential store or permission resolver failed.
    #[error("credential backend failure")]
    CollaboratorFailure(#[source] CredentialError),
}

impl AuthError {
    /// Creates an [`AuthError::ExpiredCredential`].
    #[must_use]
    pub fn expired(valid_until: DateTime<Utc>) -> Self {
        Self::ExpiredCredential { valid_until }
    }
}

impl From<CipherError> for AuthError {
    fn from(err: CipherError) -> Self {
        Self::CacheCorruption(err)
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        Self::CollaboratorFailure(err)
    }
}

/// Result alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
