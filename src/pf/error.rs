use std::ffi::OsString;
use std::fmt;
use std::io::Error as IoError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControlError>;

/// Longest stderr excerpt kept in an error
pub const STDERR_EXCERPT_LIMIT: usize = 512;

/// pfctl invocation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Enable,
    Disable,
    Load,
    Verify,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Enable => "enable filtering",
            Operation::Disable => "disable filtering",
            Operation::Load => "load rules",
            Operation::Verify => "list rules",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Failed to execute '{}' to {operation}", .program.to_string_lossy())]
    Launch {
        operation: Operation,
        program: OsString,
        #[source]
        source: IoError,
    },

    #[error("pfctl failed to {operation} (exit code {}): {stderr_excerpt}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Failed {
        operation: Operation,
        exit_code: Option<i32>,
        stderr_excerpt: String,
    },

    #[error("Failed to hand rules to pfctl for {operation}")]
    Transport {
        operation: Operation,
        #[source]
        source: IoError,
    },
}

impl ControlError {
    pub fn launch(operation: Operation, program: impl Into<OsString>, source: IoError) -> Self {
        Self::Launch {
            operation,
            program: program.into(),
            source,
        }
    }

    pub fn failed(operation: Operation, exit_code: Option<i32>, stderr: &str) -> Self {
        Self::Failed {
            operation,
            exit_code,
            stderr_excerpt: excerpt(stderr),
        }
    }

    pub fn transport(operation: Operation, source: IoError) -> Self {
        Self::Transport { operation, source }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Launch { operation, .. }
            | Self::Failed { operation, .. }
            | Self::Transport { operation, .. } => *operation,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    pub fn stderr_excerpt(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr_excerpt, .. } => Some(stderr_excerpt),
            _ => None,
        }
    }

    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::Launch { source, .. } | Self::Transport { source, .. } => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            Self::Failed { stderr_excerpt, .. } => {
                stderr_excerpt.contains("Permission denied")
                    || stderr_excerpt.contains("Operation not permitted")
            }
        }
    }
}

/// Trimmed stderr capped at [`STDERR_EXCERPT_LIMIT`] bytes on a char boundary
pub fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_EXCERPT_LIMIT {
        return trimmed.to_string();
    }

    let mut end = STDERR_EXCERPT_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
