use std::fmt;
use thiserror::Error;

/// Pipeline step an isolation run failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Extract,
    Stamp,
    Enable,
    Load,
    Disable,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Extract => "extract manager endpoint",
            Step::Stamp => "stamp audit record",
            Step::Enable => "enable packet filter",
            Step::Load => "load isolation rules",
            Step::Disable => "disable packet filter",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("Isolation aborted at step '{step}': {source}")]
pub struct IsolationError {
    pub step: Step,
    #[source]
    pub source: Box<crate::Error>,
}

impl IsolationError {
    pub fn new(step: Step, source: impl Into<crate::Error>) -> Self {
        Self {
            step,
            source: Box::new(source.into()),
        }
    }

    pub fn source_error(&self) -> &crate::Error {
        &self.source
    }

    /// Whether the document or firewall may have been changed before the failure
    pub fn after_mutation(&self) -> bool {
        !matches!(self.step, Step::Extract)
    }

    pub fn exit_code(&self) -> i32 {
        match self.step {
            Step::Extract => 2,
            Step::Stamp => 3,
            Step::Enable | Step::Load | Step::Disable => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentError;
    use crate::pf::{ControlError, Operation};

    #[test]
    fn test_error_message_names_step() {
        let err = IsolationError::new(Step::Extract, DocumentError::field_not_found("port"));
        assert_eq!(
            err.to_string(),
            "Isolation aborted at step 'extract manager endpoint': Field <port> not found in configuration document"
        );
        assert!(!err.after_mutation());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_codes() {
        let control = || ControlError::failed(Operation::Load, Some(1), "syntax error");
        assert_eq!(IsolationError::new(Step::Load, control()).exit_code(), 4);
        assert_eq!(IsolationError::new(Step::Enable, control()).exit_code(), 4);

        let err = IsolationError::new(
            Step::Stamp,
            DocumentError::MarkerNotFound {
                marker: "</ossec_config>".to_string(),
            },
        );
        assert_eq!(err.exit_code(), 3);
        assert!(err.after_mutation());
    }
}
