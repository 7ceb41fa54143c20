use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;
use crate::models::Role;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailAlreadyRegistered,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Email address has not been confirmed")]
    EmailNotConfirmed,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Role '{0}' cannot be chosen at sign-up")]
    RoleNotAllowed(Role),

    #[error("No user record exists for this account")]
    AccountRecordMissing,

    #[error("Auth network error: {0}")]
    Network(String),

    #[error("Auth backend error: {0}")]
    Backend(String),
}

impl AuthError {
    /// Text safe to show the user.
    pub fn user_message(&self) -> &str {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password",
            AuthError::EmailAlreadyRegistered => "An account with this email already exists",
            AuthError::WeakPassword(_) => "Password must be at least 6 characters long",
            AuthError::EmailNotConfirmed => "Please confirm your email address before signing in",
            AuthError::NotAuthenticated => "Your session has ended. Please sign in again.",
            AuthError::RoleNotAllowed(_) => "Please choose boutique or tailor",
            AuthError::AccountRecordMissing => "Your account could not be loaded. Please contact support.",
            AuthError::Network(_) => "Could not reach the server. Check your connection and try again.",
            AuthError::Backend(_) => "An unexpected error occurred",
        }
    }
}

#[derive(Error, Debug)]
pub enum IdentityLookupError {
    #[error("No users row for authenticated principal {0}")]
    MissingRecord(Uuid),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
