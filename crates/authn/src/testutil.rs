//! Shared test utilities for gate and cache testing.
//!
//! This module provides principal factories and an assertion macro for
//! gate decisions. It is feature-gated behind `testutil` to prevent leaking
//! into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! keygate-authn = { path = "../authn", features = ["testutil"] }
//! ```

use keygate_credentials::{CachedPrincipal, Permission};

/// Builds a principal with the given identity and named permissions.
#[must_use]
pub fn principal_with_permissions(identity: &str, permissions: &[&str]) -> CachedPrincipal {
    CachedPrincipal::new(identity, permissions.iter().copied().map(Permission::new).collect())
}

/// Builds a principal with a single `read` permission.
#[must_use]
pub fn read_only_principal(identity: &str) -> CachedPrincipal {
    principal_with_permissions(identity, &["read"])
}

/// Asserts that a [`Decision`](crate::gate::Decision) matches the expected
/// variant.
///
/// # Examples
///
/// ```
/// use keygate_authn::{assert_decision, gate::Decision};
///
/// assert_decision!(Decision::Unauthorized, Unauthorized);
/// ```
#[macro_export]
macro_rules! assert_decision {
    ($decision:expr, $variant:ident) => {
        match &$decision {
            $crate::gate::Decision::$variant { .. } => {},
            other => panic!(
                "expected Decision::{}, got {:?}",
                stringify!($variant),
                other
            ),
        }
    };
}
