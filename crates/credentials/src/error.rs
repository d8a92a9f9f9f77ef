//! Credential lookup error types and result alias.
//!
//! This module defines the errors a credential backend can produce. All
//! backends must map their internal failures to these standardized types so
//! the authentication layer can treat them uniformly (every variant is a
//! collaborator failure and resolves to a denial, never an allow).
//!
//! # Example
//!
//! ```
//! use keygate_credentials::{CredentialError, CredentialResult};
//!
//! fn lookup(raw_key: &str) -> CredentialResult<Vec<u8>> {
//!     Err(CredentialError::timeout())
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for credential store and resolver operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Errors that can occur during credential lookup or permission resolution.
///
/// "Key not found" is not an error: [`CredentialStore::lookup_by_key`] returns
/// `Ok(None)` for unknown keys. These variants cover backend failures only.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
///
/// [`CredentialStore::lookup_by_key`]: crate::store::CredentialStore::lookup_by_key
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CredentialError {
    /// Connection or network error.
    ///
    /// The credential backend could not be reached (connection refused,
    /// DNS failure, broken pipe).
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    ///
    /// The lookup exceeded its configured time limit.
    #[error("Operation timeout")]
    Timeout,

    /// Internal backend error.
    ///
    /// Catch-all for backend-specific failures that don't fit other
    /// categories.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },
}

impl CredentialError {
    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }
}
