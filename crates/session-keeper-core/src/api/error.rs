use serde::Deserialize;
use thiserror::Error;

/// Message shown when the provider gave us nothing we can interpret.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred!";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("The email address is already in use by another account.")]
    EmailExists,

    #[error("There is no user record corresponding to this identifier. The user may have been deleted.")]
    EmailNotFound,

    #[error("The user account has been disabled by an administrator.")]
    UserDisabled,

    #[error("The password is invalid or the user does not have a password.")]
    InvalidPassword,

    /// Provider code we have no friendlier wording for; shown as-is.
    #[error("{0}")]
    Provider(String),

    /// Transport failure or a response we could not parse. The detail is for logs only.
    #[error("{}", GENERIC_ERROR_MESSAGE)]
    Unexpected(String),
}

/// Maximum length for error response bodies in error details
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl AuthError {
    pub fn from_code(code: &str) -> Self {
        match code {
            "EMAIL_EXISTS" => AuthError::EmailExists,
            "EMAIL_NOT_FOUND" => AuthError::EmailNotFound,
            "USER_DISABLED" => AuthError::UserDisabled,
            "INVALID_PASSWORD" => AuthError::InvalidPassword,
            other => AuthError::Provider(other.to_string()),
        }
    }

    /// Build an error from a failed response body of the form `{"error":{"message":CODE}}`.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let code = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error)
            .and_then(|error| error.message);

        match code {
            Some(code) => Self::from_code(&code),
            None => AuthError::Unexpected(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// The provider's code, when the error came from one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AuthError::EmailExists => Some("EMAIL_EXISTS"),
            AuthError::EmailNotFound => Some("EMAIL_NOT_FOUND"),
            AuthError::UserDisabled => Some("USER_DISABLED"),
            AuthError::InvalidPassword => Some("INVALID_PASSWORD"),
            AuthError::Provider(code) => Some(code),
            AuthError::Unexpected(_) => None,
        }
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Unexpected(e.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
