//! Authentication errors.
//!
//! Every failure the auth pipeline can produce. Client-facing variants carry
//! fixed messages; storage problems are reported generically and only logged
//! in detail.

use std::fmt;

use thiserror::Error;

use super::store::StoreError;

/// Signup field that failed syntax validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Password,
    FirstName,
    LastName,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Password => "password",
            Field::FirstName => "first name",
            Field::LastName => "last name",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A signup field failed its syntax rule.
    #[error("Invalid {0}")]
    InvalidField(Field),

    /// Username is already registered.
    #[error("User already exists")]
    UserExists,

    /// Username or password is wrong. Never says which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No credential header on the request.
    #[error("Please provide a JWT token")]
    MissingToken,

    /// Malformed, mis-signed or expired token. Never says which.
    #[error("JWT Verification Failed")]
    InvalidToken,

    /// Token subject no longer has an account.
    #[error("User not found")]
    UserNotFound,

    /// Request body missing required fields or not parseable.
    #[error("fields can't be empty")]
    MalformedRequest,

    /// Backing storage failed.
    #[error("storage error: {0}")]
    Storage(StoreError),

    /// Storage did not answer within the configured timeout.
    #[error("storage operation timed out")]
    Timeout,

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DeadlineExceeded => AuthError::Timeout,
            other => AuthError::Storage(other),
        }
    }
}

impl AuthError {
    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidField(_) => "invalid_field",
            AuthError::UserExists => "user_exists",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken => "invalid_token",
            AuthError::UserNotFound => "user_not_found",
            AuthError::MalformedRequest => "malformed_request",
            AuthError::Storage(_) => "storage",
            AuthError::Timeout => "timeout",
            AuthError::Internal(_) => "internal",
        }
    }

    /// Whether the caller caused the failure (as opposed to the service).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::Storage(_) | AuthError::Timeout | AuthError::Internal(_)
        )
    }

    /// HTTP status code for this failure.
    pub fn status(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "Internal server error".to_string()
        }
    }
}
