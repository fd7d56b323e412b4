//! Error types for background removal operations

use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Error types for talking to the background removal service
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required service credential is not configured
    #[error("{0}")]
    MissingCredential(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed or incomplete data URI
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// The service answered, but not with a usable result
    #[error("Processing failed. Status: {}. Details: {}", .status.as_deref().unwrap_or("unknown"), .details)]
    Processing {
        /// Status reported by the service (HTTP code or `status` field)
        status: Option<String>,
        /// Diagnostic payload returned alongside the failure
        details: String,
    },

    /// The service could not be reached
    #[error("Network error: {0}")]
    Network(String),
}

impl BgRemovalError {
    /// Create a new missing credential error for the given variable
    pub fn missing_credential(variable: &str) -> Self {
        Self::MissingCredential(format!("{variable} is not configured."))
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid data URI error
    pub fn invalid_data_uri<S: Into<String>>(msg: S) -> Self {
        Self::InvalidDataUri(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(status: Option<String>, details: S) -> Self {
        Self::Processing {
            status,
            details: details.into(),
        }
    }

    /// Create a network error with context
    pub fn network_error<E: std::fmt::Display>(context: &str, error: E) -> Self {
        Self::Network(format!("{context}: {error}"))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {operation} '{path_display}': {error}"),
        ))
    }

    /// True when the service could not be reached at all
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// True for errors caused by local configuration rather than the service
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::InvalidConfig(_))
    }

    /// Status reported with a processing failure, if any
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Processing { status, .. } => status.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = BgRemovalError::missing_credential("CLAID_API_KEY");
        assert!(matches!(err, BgRemovalError::MissingCredential(_)));
        assert!(err.is_configuration());
        assert!(!err.is_network());

        let err = BgRemovalError::network_error("POST failed", "connection refused");
        assert!(err.is_network());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = BgRemovalError::missing_credential("CLAID_API_KEY");
        assert_eq!(err.to_string(), "CLAID_API_KEY is not configured.");

        let err = BgRemovalError::processing(Some("failed".to_string()), r#"{"code":42}"#);
        assert_eq!(
            err.to_string(),
            r#"Processing failed. Status: failed. Details: {"code":42}"#
        );
        assert_eq!(err.status(), Some("failed"));

        let err = BgRemovalError::processing(None, "no output");
        assert!(err.to_string().contains("Status: unknown"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_file_io_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = BgRemovalError::file_io_error("write download", Path::new("/out/a.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write download"));
        assert!(error_string.contains("/out/a.png"));
        assert!(matches!(
            err,
            BgRemovalError::Io(ref e) if e.kind() == std::io::ErrorKind::PermissionDenied
        ));
    }
}
