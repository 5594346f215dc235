//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `Session`: the authenticated identity window and its persisted form
//! - `SessionStore`: observable single-slot holder of the current session
//! - `ExpiryScheduler`: one-shot timer that ends the session on expiry
//! - `SessionManager`: signs in, signs up, restores and logs out
//!
//! Sessions are persisted between runs and end when the provider-issued
//! token expires.

pub mod manager;
pub mod navigator;
pub mod scheduler;
pub mod session;
pub mod store;

pub use manager::SessionManager;
pub use navigator::{ChannelNavigator, Navigator, NoopNavigator, LOGIN_ROUTE};
pub use scheduler::ExpiryScheduler;
pub use session::{PersistedRecord, Session};
pub use store::{SessionStore, Subscription};
