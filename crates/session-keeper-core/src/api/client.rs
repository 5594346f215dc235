//! Client for the remote identity provider's sign-up and sign-in endpoints.
//!
//! Each call is a single POST with no retries; failures are normalized into
//! [`AuthError`] and handed back to the caller untouched.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AuthError;
use crate::config::Config;

/// Successful authentication as reported by the provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthPayload {
    pub id_token: String,
    pub email: String,
    pub refresh_token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub local_id: String,
    pub registered: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    id_token: String,
    email: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: String,
    local_id: String,
    registered: Option<bool>,
}

// Tokens stay out of logs
impl fmt::Debug for AuthPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthPayload")
            .field("id_token", &format_args!("<redacted>"))
            .field("email", &self.email)
            .field("refresh_token", &format_args!("<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("local_id", &self.local_id)
            .field("registered", &self.registered)
            .finish()
    }
}

/// Something that can exchange credentials for an [`AuthPayload`].
pub trait IdentityProvider: Send + Sync + 'static {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthPayload, AuthError>> + Send;

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthPayload, AuthError>> + Send;
}

/// HTTP client for the identity endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    signup_url: String,
    signin_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            signup_url: config.signup_url.clone(),
            signin_url: config.signin_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn post_credentials(
        &self,
        url: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthPayload, AuthError> {
        let request = AuthRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url, "Identity request failed to send");
                AuthError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!(error = %e, %status, url, "Failed to read identity response body");
            AuthError::from(e)
        })?;
        debug!(%status, url, "Identity response received");
        parse_auth_response(status, &body)
    }
}

impl IdentityProvider for IdentityClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        self.post_credentials(&self.signup_url, email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        self.post_credentials(&self.signin_url, email, password).await
    }
}

/// Turn a raw provider response into a payload or a normalized error.
pub fn parse_auth_response(status: StatusCode, body: &str) -> Result<AuthPayload, AuthError> {
    if !status.is_success() {
        return Err(AuthError::from_response(status, body));
    }

    let response: AuthResponse = serde_json::from_str(body)
        .map_err(|e| AuthError::Unexpected(format!("Failed to parse auth response: {}", e)))?;

    let expires_in = response
        .expires_in
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| {
            AuthError::Unexpected(format!("Invalid expiresIn: {:?}", response.expires_in))
        })?;

    Ok(AuthPayload {
        id_token: response.id_token,
        email: response.email,
        refresh_token: response.refresh_token,
        expires_in,
        local_id: response.local_id,
        registered: response.registered,
    })
}

// ============================================================================
// Tests
// ============================================================================
