//! Authentication decision gate.
//!
//! [`AuthenticationGate`] turns a raw API key (or its absence) into a single
//! [`Decision`]: `Authorized` with the resolved principal, `Unauthorized`, or
//! `Forbidden`. Every internal failure — an unreadable cache entry, a
//! credential store outage, a resolver timeout — collapses to `Unauthorized`.
//! The gate never authorizes by accident.
//!
//! On a cache miss the gate consults the credential store, resolves the
//! subject's permissions, and seals the result back into the cache so the
//! next request with the same key skips both round trips.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use fail::fail_point;
use keygate_credentials::{
    CachedPrincipal, CredentialError, CredentialStore, PrincipalResolver,
};
use sha2::{Digest, Sha256};

use crate::{
    cache::{Lookup, PrincipalCache},
    error::{AuthError, AuthResult},
};

/// Header carrying the API key on inbound requests.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extracts the API key from a request header map.
///
/// Returns `None` when the header is absent or not valid UTF-8 (the latter
/// can never match a stored key anyway).
#[must_use]
pub fn api_key_from_headers(headers: &http::HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|value| value.to_str().ok())
}

/// Terminal outcome of an authentication attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// The request is authenticated; carries the resolved principal.
    Authorized(CachedPrincipal),
    /// The request could not be authenticated. Covers missing keys, unknown
    /// keys, and every internal failure.
    Unauthorized,
    /// The credential was recognized but is no longer valid.
    Forbidden,
}

impl Decision {
    /// Returns `true` for [`Decision::Authorized`].
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    /// Returns the principal when authorized.
    #[must_use]
    pub fn principal(&self) -> Option<&CachedPrincipal> {
        match self {
            Self::Authorized(principal) => Some(principal),
            _ => None,
        }
    }
}

impl From<&AuthError> for Decision {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::ExpiredCredential { .. } => Self::Forbidden,
            _ => Self::Unauthorized,
        }
    }
}

/// Short, non-reversible identifier for an API key, safe to log.
///
/// First 6 bytes of the SHA-256 digest, base64url without padding. Raw keys
/// never appear in logs or error messages.
#[must_use]
pub fn key_fingerprint(raw_key: &str) -> String {
    let digest = Sha256::digest(raw_key.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..6])
}

/// Decides whether requests are authenticated, caching resolved principals.
///
/// Cheaply cloneable; clones share the cache and collaborators.
#[derive(Clone)]
pub struct AuthenticationGate {
    cache: PrincipalCache,
    credentials: Arc<dyn CredentialStore>,
    resolver: Arc<dyn PrincipalResolver>,
}

impl AuthenticationGate {
    /// Creates a gate over the given cache and collaborators.
    #[must_use]
    pub fn new(
        cache: PrincipalCache,
        credentials: Arc<dyn CredentialStore>,
        resolver: Arc<dyn PrincipalResolver>,
    ) -> Self {
        Self { cache, credentials, resolver }
    }

    /// Authenticates a request presenting `api_key` (or nothing).
    ///
    /// Infallible by construction: internal errors are logged and collapsed
    /// into [`Decision::Unauthorized`], except an expired credential which
    /// yields [`Decision::Forbidden`].
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, api_key: Option<&str>) -> Decision {
        match self.try_authenticate(api_key).await {
            Ok(principal) => Decision::Authorized(principal),
            Err(err) => {
                let decision = Decision::from(&err);
                match &err {
                    AuthError::MissingCredential => {
                        tracing::debug!("request presented no API key");
                    },
                    AuthError::UnknownCredential => {
                        tracing::debug!("request presented an unknown API key");
                    },
                    AuthError::ExpiredCredential { valid_until } => {
                        tracing::debug!(%valid_until, "request presented an expired credential");
                    },
                    _ => {
                        tracing::warn!(error = %err, "authentication failed closed");
                    },
                }
                decision
            },
        }
    }

    async fn try_authenticate(&self, api_key: Option<&str>) -> AuthResult<CachedPrincipal> {
        let raw_key = api_key.ok_or(AuthError::MissingCredential)?;

        match self.cache.get(raw_key) {
            Ok(Lookup::Hit(principal)) => {
                tracing::trace!("cache hit");
                return Ok(principal);
            },
            Ok(Lookup::Miss) => {},
            Err(cipher_err) => {
                // Unreadable entry: fall closed rather than retrying the
                // store, so the corruption stays visible to operators.
                let fingerprint = key_fingerprint(raw_key);
                tracing::warn!(
                    audit.action = "cache_corruption_detected",
                    audit.resource = %format_args!("key:{fingerprint}"),
                    audit.result = %format_args!("failure: {cipher_err}"),
                    "audit_event"
                );
                return Err(AuthError::CacheCorruption(cipher_err));
            },
        }

        fail_point!("gate-before-credential-lookup", |_| {
            Err(AuthError::CollaboratorFailure(CredentialError::internal(
                "injected failure before credential lookup",
            )))
        });

        let record = self
            .credentials
            .lookup_by_key(raw_key)
            .await?
            .ok_or(AuthError::UnknownCredential)?;

        if record.is_expired() {
            return Err(AuthError::expired(record.valid_until));
        }

        let permissions = self.resolver.resolve(&record.subject).await?;
        let principal = CachedPrincipal::new(record.subject.clone(), permissions);

        if let Err(err) = self.cache.put_default(raw_key, &principal) {
            // The lookup already succeeded; a failed cache write only costs
            // the next request a store round trip.
            tracing::warn!(
                key.fingerprint = %key_fingerprint(raw_key),
                error = %err,
                "failed to cache resolved principal"
            );
        }

        Ok(principal)
    }
}

impl std::fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationGate").field("cache", &self.cache).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use http::HeaderMap;

    use super::*;

    #[test]
    fn test_api_key_from_headers_present() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, "sk-test-1".parse().unwrap());
        assert_eq!(api_key_from_headers(&headers), Some("sk-test-1"));
    }

    #[test]
    fn test_api_key_from_headers_absent() {
        assert_eq!(api_key_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = key_fingerprint("sk-test-1");
        let b = key_fingerprint("sk-test-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8, "6 bytes base64url-encoded without padding");
        assert_ne!(a, key_fingerprint("sk-test-2"));
        assert!(!a.contains("sk-test-1"));
    }

    #[test]
    fn test_decision_from_error_fails_closed() {
        let expired = AuthError::expired(chrono::Utc::now());
        assert_eq!(Decision::from(&expired), Decision::Forbidden);
        assert_eq!(Decision::from(&AuthError::MissingCredential), Decision::Unauthorized);
        assert_eq!(Decision::from(&AuthError::UnknownCredential), Decision::Unauthorized);
        let corruption = AuthError::CacheCorruption(crate::cipher::CipherError::AuthenticationTagMismatch);
        assert_eq!(Decision::from(&corruption), Decision::Unauthorized);
    }

    #[test]
    fn test_decision_accessors() {
        let principal = CachedPrincipal::new("u1", Vec::new());
        let authorized = Decision::Authorized(principal.clone());
        assert!(authorized.is_authorized());
        assert_eq!(authorized.principal(), Some(&principal));
        assert!(!Decision::Unauthorized.is_authorized());
        assert_eq!(Decision::Forbidden.principal(), None);
    }
}
