use std::io::Error as IoError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read configuration document {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("Field <{field}> not found in configuration document")]
    FieldNotFound { field: String },

    #[error("Malformed port '{value}': {reason}")]
    MalformedPort { value: String, reason: String },

    #[error("Malformed address '{value}': {reason}")]
    MalformedAddress { value: String, reason: String },

    #[error("Closing marker '{marker}' not found in configuration document")]
    MarkerNotFound { marker: String },

    #[error("Closing marker '{marker}' appears {count} times, expected exactly once")]
    MarkerNotUnique { marker: String, count: usize },

    #[error("Failed to write configuration document {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: IoError,
    },
}

impl DocumentError {
    pub fn read(path: impl Into<PathBuf>, source: IoError) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: IoError) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn field_not_found(field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            field: field.into(),
        }
    }

    pub fn malformed_port(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPort {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_address(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAddress {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Errors that happen before anything has been mutated
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            Self::Read { .. }
                | Self::FieldNotFound { .. }
                | Self::MalformedPort { .. }
                | Self::MalformedAddress { .. }
        )
    }

    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }
}
