//! Error types for faculty-core

use thiserror::Error;

/// Crate-wide error
#[derive(Debug, Error)]
pub enum Error {
    /// Login failure. Deliberately says nothing about which field was wrong.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Token rejected: {0}")]
    Token(#[from] TokenError),

    /// The token verified but its subject is gone or deactivated.
    #[error("Identity is inactive or no longer exists")]
    IdentityInactiveOrMissing,

    #[error("Access denied: {0}")]
    Access(#[from] AccessDenied),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Token verification failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,
}

/// Rejections produced by the authorization gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// No usable principal is attached to the request.
    #[error("authentication required")]
    Unauthenticated,

    /// A principal is attached but its role is not allowed here.
    #[error("insufficient role for this resource")]
    Forbidden,
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<password_hash::Error> for Error {
    fn from(err: password_hash::Error) -> Self {
        Error::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
