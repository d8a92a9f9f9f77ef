//! # Keygate Credentials
//!
//! Collaborator interfaces for API-key authentication: the durable credential
//! store and the principal resolver, plus the domain types that flow between
//! them and the authentication layer.
//!
//! This crate provides:
//! - **[`CredentialStore`]**: raw key → [`CredentialRecord`] lookup
//! - **[`PrincipalResolver`]**: validated identity → effective permission set
//! - **Memory implementations** for testing and development
//!
//! ## Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use keygate_credentials::{
//!     CredentialRecord, CredentialStore, MemoryCredentialStore, MemoryPrincipalResolver,
//!     Permission, PrincipalResolver, SubjectId,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryCredentialStore::new();
//!     store.create_credential(
//!         "abc123",
//!         CredentialRecord::builder()
//!             .subject("u1")
//!             .valid_until(Utc::now() + Duration::days(30))
//!             .build(),
//!     );
//!
//!     let resolver = MemoryPrincipalResolver::new();
//!     resolver.grant("u1", vec![Permission::new("read")]);
//!
//!     let record = store.lookup_by_key("abc123").await?.ok_or("unknown key")?;
//!     let permissions = resolver.resolve(&record.subject).await?;
//!     assert_eq!(permissions, vec![Permission::new("read")]);
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Credential lookup error types.
pub mod error;
/// Principal resolver trait and memory implementation.
pub mod resolver;
/// Credential store trait and memory implementation.
pub mod store;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
/// Shared test helpers (stub collaborators, record factories).
pub mod testutil;
/// Shared domain types.
pub mod types;

// Re-export key types for convenience
pub use error::{BoxError, CredentialError, CredentialResult};
pub use resolver::{MemoryPrincipalResolver, PrincipalResolver};
pub use store::{CredentialStore, MemoryCredentialStore};
pub use types::{CachedPrincipal, CredentialRecord, Permission, SubjectId};
