//! # Error Types
//!
//! Crate-wide error type for the gatekeeper using `thiserror`.

/// Custom result type for gatekeeper operations
pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the gatekeeper
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors; fatal at startup
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Validation errors on configuration or request input
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Credential missing or invalid. Deliberately carries no detail.
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated caller is not allowed to perform the operation
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Failure of an external collaborator (object store, CA provider)
    #[error("Upstream failure: {message}")]
    Upstream {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Network transport errors for the HTTP listener
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(message: S, source: BoxError) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create an upstream failure wrapping the collaborator's error
    pub fn upstream<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream { message: message.into(), source: Some(Box::new(source)) }
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 500,
            Error::Validation { .. } => 400,
            Error::Unauthenticated => 401,
            Error::Forbidden { .. } => 403,
            Error::NotFound { .. } => 404,
            Error::Upstream { .. } => 500,
            Error::Transport(_) => 500,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect();
        fields.sort();

        Self::validation(format!("Validation failed: {}", fields.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = Error::config("missing authorities");
        assert!(matches!(error, Error::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: missing authorities");
    }

    #[test]
    fn test_validation_error() {
        let error = Error::validation_field("must not be empty", "tenant_id");
        if let Error::Validation { field, .. } = error {
            assert_eq!(field, Some("tenant_id".to_string()));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::validation("test").status_code(), 400);
        assert_eq!(Error::Unauthenticated.status_code(), 401);
        assert_eq!(Error::forbidden("test").status_code(), 403);
        assert_eq!(Error::not_found("certificate authority", "pigeon").status_code(), 404);
        assert_eq!(Error::transport("bind failed").status_code(), 500);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert_eq!(Error::upstream("crl retrieval failed", io).status_code(), 500);
    }

    #[test]
    fn test_unauthenticated_reveals_nothing() {
        assert_eq!(Error::Unauthenticated.to_string(), "Authentication required");
    }

    #[test]
    fn test_config_error_conversion() {
        let error: Error = config::ConfigError::Message("bad layer".to_string()).into();
        assert!(matches!(error, Error::Config { source: Some(_), .. }));
        assert_eq!(error.status_code(), 500);
    }
}
