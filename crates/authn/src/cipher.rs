//! Authenticated encryption for cached principals.
//!
//! This module provides [`Cipher`], the symmetric AEAD primitive used to
//! encrypt principals at rest in the in-process cache. The algorithm is
//! AES-256 in Galois/Counter Mode; a fresh random 96-bit nonce is generated
//! per seal and stored alongside the ciphertext and authentication tag.
//!
//! # Sealed payload layout
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ nonce (12 B) │ ciphertext + tag (16 B tag)  │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! # Key lifecycle
//!
//! The key is generated once from the OS RNG at construction and lives only
//! inside the [`Cipher`]. It is never persisted, never exposed to callers,
//! and never logged; a process restart therefore invalidates every payload
//! sealed by the previous key.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use bytes::{Bytes, BytesMut};
use thiserror::Error;
use zeroize::Zeroizing;

/// Nonce length in bytes (96-bit, the AES-GCM standard size).
const NONCE_LEN: usize = 12;

/// Errors produced when sealing or opening a payload.
///
/// Tag mismatch and malformed payload are deliberately distinguishable:
/// the former means tampering or corruption of well-formed ciphertext, the
/// latter means the payload structure itself is unusable (too short to hold
/// a nonce, or the decrypted bytes fail to decode).
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CipherError {
    /// Tag verification failed during decryption (tampering or corruption).
    #[error("Authentication tag mismatch")]
    AuthenticationTagMismatch,

    /// The payload structure is unusable.
    #[error("Malformed payload: {message}")]
    MalformedPayload {
        /// Description of what made the payload unusable.
        message: String,
    },

    /// Encryption-side failure. Practically unreachable with valid inputs.
    #[error("Seal failure: {message}")]
    SealFailure {
        /// Description of the encryption failure.
        message: String,
    },
}

impl CipherError {
    /// Creates a new `MalformedPayload` error with the given message.
    #[must_use]
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload { message: message.into() }
    }

    /// Creates a new `SealFailure` error with the given message.
    #[must_use]
    pub fn seal_failure(message: impl Into<String>) -> Self {
        Self::SealFailure { message: message.into() }
    }
}

/// AES-256-GCM seal/open pair over a process-lifetime key.
pub struct Cipher {
    inner: Aes256Gcm,
}

impl Cipher {
    /// Creates a cipher with a fresh random 256-bit key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        // Wrap the raw key bytes in Zeroizing so they are scrubbed from
        // memory once the AES key schedule has been derived.
        let key_bytes: Zeroizing<[u8; 32]> = Zeroizing::new(Aes256Gcm::generate_key(OsRng).into());
        let inner = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&*key_bytes));
        Self { inner }
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    ///
    /// The returned payload carries the nonce, ciphertext, and authentication
    /// tag; it is only openable by this `Cipher` instance.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::SealFailure`] if the AEAD backend rejects the
    /// input (plaintext beyond the AES-GCM length bound).
    pub fn seal(&self, plaintext: &[u8]) -> Result<Bytes, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(OsRng);
        let ciphertext = self
            .inner
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::seal_failure("AEAD encryption rejected input"))?;

        let mut sealed = BytesMut::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed.freeze())
    }

    /// Decrypts a sealed payload, verifying its authentication tag.
    ///
    /// # Errors
    ///
    /// - [`CipherError::MalformedPayload`] if the payload is too short to contain a nonce
    /// - [`CipherError::AuthenticationTagMismatch`] if tag verification fails
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
        if sealed.len() < NONCE_LEN {
            return Err(CipherError::malformed_payload(format!(
                "sealed payload shorter than nonce: {} bytes",
                sealed.len()
            )));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.inner
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::AuthenticationTagMismatch)
    }
}

// Opaque Debug: key material must never leak through logs or panic output.
impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}
