use thiserror::Error;

use crate::filter::FilterError;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Malformed {collection} record: {reason}")]
    MalformedRecord { collection: &'static str, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Transient failures worth retrying by the user.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Network(_) => true,
            GatewayError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Network("connection reset".to_string()).is_transient());
        assert!(GatewayError::Status { status: 503, message: "unavailable".to_string() }.is_transient());
        assert!(!GatewayError::Status { status: 403, message: "denied".to_string() }.is_transient());
        assert!(!GatewayError::NotFound("Job".to_string()).is_transient());
    }
}
