//! Client-side session management for an identity-provider backed app.
//!
//! Authenticates against the provider's sign-up/sign-in endpoints, holds the
//! resulting session in an observable store, persists it across restarts and
//! logs out automatically when the token expires.

pub mod api;
pub mod auth;
pub mod config;
pub mod storage;

pub use api::{AuthError, AuthPayload, IdentityClient, IdentityProvider};
pub use auth::{Navigator, Session, SessionManager, SessionStore};
pub use config::{Config, StorageBackend};
pub use storage::{KeyValueStorage, SessionPersistence};
