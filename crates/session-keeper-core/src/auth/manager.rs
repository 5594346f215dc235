//! Session lifecycle coordination.
//!
//! `SessionManager` is the only writer of the [`SessionStore`]. It moves
//! between two states: unauthenticated (store holds `None`, no timer) and
//! authenticated (store holds a session, expiry timer armed).

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use super::navigator::{Navigator, LOGIN_ROUTE};
use super::scheduler::ExpiryScheduler;
use super::store::{SessionStore, Subscription};
use super::Session;
use crate::api::{AuthError, AuthPayload, IdentityProvider};
use crate::storage::SessionPersistence;

struct Inner<P> {
    provider: P,
    store: SessionStore,
    persistence: SessionPersistence,
    scheduler: ExpiryScheduler,
    navigator: Arc<dyn Navigator>,
}

/// Coordinates authentication, the session store, persistence and expiry.
/// Clone is cheap and clones share the same session.
pub struct SessionManager<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for SessionManager<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: IdentityProvider> SessionManager<P> {
    pub fn new(
        provider: P,
        persistence: SessionPersistence,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                store: SessionStore::new(),
                persistence,
                scheduler: ExpiryScheduler::new(),
                navigator,
            }),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.store.current()
    }

    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(observer)
    }

    pub fn is_expiry_armed(&self) -> bool {
        self.inner.scheduler.is_armed()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Register a new account and start a session for it.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        Self::check_credentials(email, password)?;
        debug!(email, "Signing up");
        let payload = self.inner.provider.sign_up(email, password).await.map_err(|e| {
            warn!(error = %e, email, "Sign-up failed");
            e
        })?;
        self.handle_authentication(payload)
    }

    /// Authenticate an existing account and start a session for it.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        Self::check_credentials(email, password)?;
        debug!(email, "Signing in");
        let payload = self.inner.provider.sign_in(email, password).await.map_err(|e| {
            warn!(error = %e, email, "Sign-in failed");
            e
        })?;
        self.handle_authentication(payload)
    }

    /// Restore a persisted session at startup.
    ///
    /// Returns `true` when a session was restored. A record that has already
    /// expired is discarded instead of being published. Must run inside a
    /// tokio runtime so the expiry timer can be armed; otherwise nothing is
    /// restored and the record is left in place.
    pub fn auto_login(&self) -> bool {
        if let Err(e) = Handle::try_current() {
            error!(error = %e, "No async runtime available, session not restored");
            return false;
        }

        let Some(record) = self.inner.persistence.load() else {
            debug!("No persisted session");
            return false;
        };

        let email = record.email.clone();
        let Some(session) = record.into_session() else {
            info!(email = %email, "Persisted session expired, discarding");
            self.inner.persistence.clear();
            return false;
        };

        let remaining = session.time_until_expiry().to_std().unwrap_or(Duration::ZERO);
        self.inner.store.set(Some(session));
        self.auto_logout(remaining);
        info!(email = %email, remaining_secs = remaining.as_secs(), "Session restored");
        true
    }

    /// End the session. Safe to call when already signed out.
    pub fn logout(&self) {
        let inner = &self.inner;
        inner.scheduler.cancel();
        inner.store.set(None);
        inner.persistence.clear();
        inner.navigator.navigate(LOGIN_ROUTE);
        info!("Logged out");
    }

    /// Log out automatically once `duration` has elapsed.
    pub fn auto_logout(&self, duration: Duration) {
        // Weak so a pending timer does not keep the manager alive
        let weak: Weak<Inner<P>> = Arc::downgrade(&self.inner);
        self.inner.scheduler.arm(duration, move || {
            if let Some(inner) = weak.upgrade() {
                info!("Session expired");
                SessionManager { inner }.logout();
            }
        });
    }

    fn handle_authentication(&self, payload: AuthPayload) -> Result<Session, AuthError> {
        let expires_at = i64::try_from(payload.expires_in)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::Unexpected(format!("expiresIn out of range: {}", payload.expires_in))
            })?;

        let session = Session::new(payload.email, payload.local_id, payload.id_token, expires_at)
            .ok_or_else(|| AuthError::Unexpected("Provider returned an unusable token".to_string()))?;

        self.inner.store.set(Some(session.clone()));

        // The store stays authoritative for this process even if the write fails
        if let Err(e) = self.inner.persistence.save(&session) {
            warn!(error = %e, "Failed to persist session");
        }

        self.auto_logout(Duration::from_secs(payload.expires_in));
        info!(email = %session.email(), expires_in_secs = payload.expires_in, "Authenticated");
        Ok(session)
    }

    fn check_credentials(email: &str, password: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::Provider("MISSING_EMAIL".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::Provider("MISSING_PASSWORD".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
