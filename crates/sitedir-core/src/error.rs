use thiserror::Error;

/// Core error types for sitedir operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Hostname is required")]
    MissingHostname,

    #[error("Invalid hostname: {0:?}")]
    InvalidHostname(String),

    #[error("Invalid site ID: {0:?}")]
    InvalidId(String),

    #[error("Invalid site configuration: {message}")]
    InvalidConfig { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidHostname error
    pub fn invalid_hostname(hostname: impl Into<String>) -> Self {
        Self::InvalidHostname(hostname.into())
    }

    /// Create a new InvalidId error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Create a new InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if this error was caused by caller input rather than the system
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::MissingHostname
                | Self::InvalidHostname(_)
                | Self::InvalidId(_)
                | Self::InvalidConfig { .. }
        )
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(CoreError::MissingHostname.to_string(), "Hostname is required");
        assert_eq!(
            CoreError::invalid_hostname("a b").to_string(),
            "Invalid hostname: \"a b\""
        );
        assert_eq!(
            CoreError::invalid_config("theme must be an object").to_string(),
            "Invalid site configuration: theme must be an object"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(CoreError::MissingHostname.is_validation_error());
        assert!(CoreError::invalid_id("").is_validation_error());

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!CoreError::from(json_err).is_validation_error());
    }
}
