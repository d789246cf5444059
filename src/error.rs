use thiserror::Error;

// Define our own Result type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    // Configuration errors with location info
    #[error("Configuration error at {location}: {message}")]
    Config {
        message: String,
        location: String,
        suggestion: Option<String>,
    },

    // Module-specific errors that will be converted from module error types
    #[error(transparent)]
    DocumentModule(#[from] crate::document::error::DocumentError),

    #[error(transparent)]
    ControlModule(#[from] crate::pf::error::ControlError),

    #[error(transparent)]
    IsolationModule(#[from] crate::isolation::error::IsolationError),
}

// Helper methods for creating errors with context
impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            location: "unknown".to_string(),
            suggestion: None,
        }
    }

    pub fn config_at(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            location: location.into(),
            suggestion: None,
        }
    }

    pub fn config_with_suggestion(
        message: impl Into<String>,
        location: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            location: location.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Process exit code to report for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::IsolationModule(e) => e.exit_code(),
            Self::DocumentModule(e) if e.is_extraction_error() => 2,
            Self::DocumentModule(_) => 3,
            Self::ControlModule(_) => 4,
            _ => 1,
        }
    }

    /// Suggestion to print alongside the error, if any
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Config { suggestion, .. } => suggestion.as_deref(),
            Self::IsolationModule(e) => e.source_error().suggestion(),
            Self::ControlModule(e) if e.is_permission_error() => {
                Some("pfctl must be run as root; retry with sudo or set --pfctl-wrapper sudo")
            }
            Self::DocumentModule(e) if e.is_permission_error() => {
                Some("the agent configuration is owned by root; retry with sudo")
            }
            _ => None,
        }
    }
}
