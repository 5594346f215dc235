//! Identity provider client module.
//!
//! This module provides the `IdentityClient` for the provider's sign-up and
//! sign-in endpoints, the `IdentityProvider` seam the session manager is
//! generic over, and the `AuthError` taxonomy provider failures map into.

pub mod client;
pub mod error;

pub use client::{parse_auth_response, AuthPayload, IdentityClient, IdentityProvider};
pub use error::{AuthError, GENERIC_ERROR_MESSAGE};
