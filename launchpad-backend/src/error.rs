//! Error types for launchpad-backend.

use thiserror::Error;

use launchpad_core::CoreError;

/// All errors that can arise from a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection, TLS, timeout or body-read failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// The configured API URL cannot carry path segments.
    #[error("invalid backend URL '{0}'")]
    InvalidUrl(String),

    /// A response carried a value that failed domain validation.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl BackendError {
    /// The message the server supplied with an error status, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_includes_server_message() {
        let err = BackendError::Status {
            endpoint: "GET /hosting".to_string(),
            status: 502,
            message: Some("upstream down".to_string()),
        };
        assert_eq!(err.to_string(), "GET /hosting returned HTTP 502: upstream down");
        assert_eq!(err.server_message(), Some("upstream down"));
    }

    #[test]
    fn status_display_without_message() {
        let err = BackendError::Status {
            endpoint: "GET /hosting".to_string(),
            status: 404,
            message: None,
        };
        assert_eq!(err.to_string(), "GET /hosting returned HTTP 404");
        assert!(err.is_not_found());
    }
}
