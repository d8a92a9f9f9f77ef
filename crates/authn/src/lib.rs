//! # Keygate Authentication
//!
//! API-key authentication with an encrypted in-memory principal cache.
//!
//! This crate provides:
//! - **Principal cache**: time-bounded, AES-256-GCM-sealed cache of
//!   authenticated principals, avoiding a credential store round trip per
//!   request
//! - **Authentication gate**: collapses every lookup outcome into a single
//!   `Authorized` / `Unauthorized` / `Forbidden` decision
//! - **Cipher**: process-lifetime AEAD sealing for cached payloads
//!
//! ## Security posture
//!
//! - Cached principals are never held in plaintext at rest in memory
//! - Raw API keys never appear in logs; only short SHA-256 fingerprints do
//! - Every internal failure fails closed to `Unauthorized`
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use keygate_authn::{AuthenticationGate, PrincipalCache};
//! use keygate_credentials::{MemoryCredentialStore, MemoryPrincipalResolver};
//!
//! # async fn example() {
//! let store = Arc::new(MemoryCredentialStore::new());
//! let resolver = Arc::new(MemoryPrincipalResolver::new());
//! let gate = AuthenticationGate::new(PrincipalCache::new(), store, resolver);
//!
//! let decision = gate.authenticate(Some("sk-live-abc123")).await;
//! if let Some(principal) = decision.principal() {
//!     println!("authenticated as {}", principal.identity);
//! }
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Encrypted, time-bounded principal cache.
pub mod cache;
/// AEAD sealing for cached payloads.
pub mod cipher;
/// Authentication error types.
pub mod error;
/// Authentication decision gate.
pub mod gate;
/// Test helpers, gated behind the `testutil` feature.
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

// Re-export key types for convenience
pub use cache::{
    CacheConfig, CacheMetricsSnapshot, DEFAULT_ENTRY_TTL, DEFAULT_SWEEP_INTERVAL, Lookup,
    PrincipalCache,
};
pub use cipher::{Cipher, CipherError};
pub use error::{AuthError, AuthResult};
pub use gate::{API_KEY_HEADER, AuthenticationGate, Decision, api_key_from_headers, key_fingerprint};
