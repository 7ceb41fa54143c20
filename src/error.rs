// Client-facing error taxonomy
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::config::ConfigError;
use crate::filter::FilterError;
use crate::gateway::GatewayError;
use crate::policy::AccessError;
use crate::session::{AuthError, IdentityLookupError};
use crate::validation::ValidationError;

/// Every failure a controller can surface to the user.
///
/// Each variant wraps the module-level error it came from; `user_message`
/// produces the text shown to the user and never leaks backend internals.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    IdentityLookup(#[from] IdentityLookupError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

impl MarketError {
    /// Stable error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            MarketError::Validation(_) => "VALIDATION_ERROR",
            MarketError::Auth(_) => "AUTH_ERROR",
            MarketError::IdentityLookup(_) => "IDENTITY_LOOKUP_ERROR",
            MarketError::Access(AccessError::Paywall { .. }) => "PAYWALL",
            MarketError::Access(AccessError::NotSignedIn) => "NOT_SIGNED_IN",
            MarketError::Access(AccessError::Forbidden(_)) => "FORBIDDEN",
            MarketError::Gateway(GatewayError::NotFound(_)) => "NOT_FOUND",
            MarketError::Gateway(_) => "GATEWAY_ERROR",
            MarketError::Config(_) => "CONFIG_ERROR",
            MarketError::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }

    /// Client-safe message
    pub fn user_message(&self) -> String {
        match self {
            MarketError::Validation(e) => e.message.clone(),
            MarketError::Auth(e) => e.user_message().to_string(),
            MarketError::IdentityLookup(e) => {
                tracing::error!("Identity lookup failed: {}", e);
                "Your account could not be loaded. Please sign in again.".to_string()
            }
            MarketError::Access(e) => e.to_string(),
            MarketError::Gateway(GatewayError::NotFound(what)) => format!("{} not found", what),
            MarketError::Gateway(e) => {
                // Don't expose backend details to users
                tracing::error!("Gateway error: {}", e);
                "Something went wrong talking to the server. Please try again.".to_string()
            }
            MarketError::Config(e) => e.to_string(),
            MarketError::NotImplemented(feature) => format!("{} is coming soon", feature),
        }
    }

    pub fn is_paywall(&self) -> bool {
        matches!(self, MarketError::Access(AccessError::Paywall { .. }))
    }

    /// JSON body for `--json` output
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.user_message(),
            "error_code": self.error_code(),
        });

        if let MarketError::Validation(ValidationError { field_errors, .. }) = self {
            if !field_errors.is_empty() {
                body["field_errors"] = json!(field_errors);
            }
        }

        body
    }

    pub fn field_errors(&self) -> Option<&HashMap<String, String>> {
        match self {
            MarketError::Validation(e) if !e.field_errors.is_empty() => Some(&e.field_errors),
            _ => None,
        }
    }
}

impl From<FilterError> for MarketError {
    fn from(err: FilterError) -> Self {
        MarketError::Gateway(GatewayError::InvalidFilter(err))
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
