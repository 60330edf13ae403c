//! Error types for Mood

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MoodError>;

/// Fallback text shown when a failure carries no server message
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum MoodError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not signed in")]
    NotSignedIn,
}

impl MoodError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MoodError::Validation(_) | MoodError::InvalidInput(_) => 3,
            MoodError::NotSignedIn => 2,
            MoodError::Request(e) if e.is_unauthorized() => 2,
            MoodError::Request(_) => 1,
            MoodError::Config(_) => 1,
            MoodError::Credential(_) => 1,
        }
    }

    /// Text suitable for a transient notification
    ///
    /// Server-provided messages win; anything without one degrades to
    /// [`GENERIC_ERROR_MESSAGE`].
    pub fn user_message(&self) -> String {
        match self {
            MoodError::Request(e) => e.user_message(),
            MoodError::Validation(e) => e.to_string(),
            MoodError::InvalidInput(msg) => msg.clone(),
            MoodError::NotSignedIn => "You need to sign in first.".to_string(),
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential not found: {0}")]
    NotFound(String),

    #[error("OS keyring unavailable: {0}")]
    KeyringUnavailable(String),

    #[error("Keyring operation failed: {0}")]
    Keyring(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: wrong master password or corrupted file")]
    DecryptionFailed,

    #[error("Master password not set")]
    MasterPasswordNotSet,

    #[error("Master password must be at least 8 characters")]
    WeakPassword,

    #[error("No credential storage backend available")]
    NoStoreAvailable,

    #[error("Stored credential record is corrupt: {0}")]
    CorruptRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single API call
///
/// Decoded once at the HTTP boundary; callers never inspect raw responses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// No response was received (connection refused, DNS, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a 4xx/5xx status
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Http { status: u16, message: Option<String> },

    /// A successful response whose body did not have the expected shape
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, bad multipart part)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RequestError {
    /// Message provided by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RequestError::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// HTTP status, if the server responded
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    pub fn user_message(&self) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
    }
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field-level validation failures, raised before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", summarize(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First message recorded for `field`
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.message.as_str())
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> std::result::Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Default for ValidationError {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_validation() {
        let mut errors = ValidationError::new();
        errors.push("email", "email must be a valid email");
        let error = MoodError::Validation(errors);
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_unauthorized() {
        let error = MoodError::Request(RequestError::Http {
            status: 401,
            message: Some("bad credentials".to_string()),
        });
        assert_eq!(error.exit_code(), 2);
        assert_eq!(MoodError::NotSignedIn.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_failures() {
        let server = MoodError::Request(RequestError::Http {
            status: 500,
            message: None,
        });
        assert_eq!(server.exit_code(), 1);

        let network = MoodError::Request(RequestError::Network("refused".to_string()));
        assert_eq!(network.exit_code(), 1);

        let config = MoodError::Config(ConfigError::MissingField("api.base_url".to_string()));
        assert_eq!(config.exit_code(), 1);

        let credential = MoodError::Credential(CredentialError::NoStoreAvailable);
        assert_eq!(credential.exit_code(), 1);
    }

    #[test]
    fn test_http_error_formatting() {
        let error = RequestError::Http {
            status: 401,
            message: Some("bad credentials".to_string()),
        };
        assert_eq!(error.to_string(), "HTTP 401: bad credentials");

        let bare = RequestError::Http {
            status: 502,
            message: None,
        };
        assert_eq!(bare.to_string(), "HTTP 502: no message");
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let error = RequestError::Http {
            status: 400,
            message: Some("content too long".to_string()),
        };
        assert_eq!(error.user_message(), "content too long");
    }

    #[test]
    fn test_user_message_degrades_without_response() {
        let error = RequestError::Network("connection refused".to_string());
        assert_eq!(error.server_message(), None);
        assert_eq!(error.user_message(), GENERIC_ERROR_MESSAGE);

        let wrapped = MoodError::Request(error);
        assert_eq!(wrapped.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_validation_error_messages() {
        let mut errors = ValidationError::new();
        errors.push("email", "email is a required field");
        errors.push("password", "password must be at least 8 characters");

        assert_eq!(errors.message_for("email"), Some("email is a required field"));
        assert_eq!(errors.message_for("nick"), None);
        assert_eq!(
            errors.to_string(),
            "email is a required field; password must be at least 8 characters"
        );
        assert!(errors.into_result().is_err());
        assert!(ValidationError::new().into_result().is_ok());
    }

    #[test]
    fn test_error_conversion_from_request_error() {
        let error: MoodError = RequestError::Decode("expected array".to_string()).into();
        match error {
            MoodError::Request(RequestError::Decode(_)) => {}
            _ => panic!("Expected MoodError::Request"),
        }
    }

    #[test]
    fn test_error_message_formatting_config() {
        let error = MoodError::Config(ConfigError::MissingField("api.base_url".to_string()));
        assert_eq!(
            error.to_string(),
            "Configuration error: Missing required field: api.base_url"
        );
    }
}
