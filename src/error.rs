//! Error types for lpjml-config.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the exact configuration problem. Every error is detected eagerly while a
//! descriptor is being configured; none of them is transient.

use std::path::PathBuf;

use thiserror::Error;

/// Errors caused by invalid arguments or by a descriptor that does not have
/// the shape an operation requires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{outputs} outputs but {resolutions} temporal resolutions were given")]
    LengthMismatch {
        outputs: usize,
        resolutions: usize,
    },

    #[error("Temporal resolution '{value}' is not available, choose from 'annual', 'monthly' and 'daily'")]
    InvalidResolution {
        value: String,
    },

    #[error("Output format '{value}' is not available, choose from 'raw', 'clm' and 'cdf'")]
    InvalidFormat {
        value: String,
    },

    #[error("The following outputs are not defined in outputvar: {ids:?}")]
    UnknownOutput {
        ids: Vec<String>,
    },

    #[error("Input '{input}' is not defined in the descriptor")]
    UnknownInput {
        input: String,
    },

    #[error("Input '{input}' has no 'id' field and cannot be wired to a socket")]
    MissingId {
        input: String,
    },

    #[error("{operation} requires either a path or a file name")]
    MissingArgument {
        operation: &'static str,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' has an unexpected type, expected {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    #[error("Year {value} in field '{field}' is out of range")]
    YearOutOfRange {
        field: &'static str,
        value: i64,
    },

    #[error("Simulation name '{value}' cannot be used in a file name")]
    InvalidSimName {
        value: String,
    },

    #[error("Field '{field}' is read-only")]
    ReadOnlyField {
        field: String,
    },

    #[error("Invalid preprocessor macro '{value}', expected -DNAME or -DNAME=VALUE")]
    InvalidMacro {
        value: String,
    },

    #[error("Invalid loader configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Errors raised at the process or filesystem boundary.
#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("Could not parse descriptor {source_path}: {message}")]
    DescriptorParse {
        source_path: PathBuf,
        message: String,
    },

    #[error("Preprocessor '{command}' failed with {status}: {stderr}")]
    Preprocess {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Preprocessor '{command}' timed out after {duration_ms}ms")]
    PreprocessTimeout {
        command: String,
        duration_ms: u64,
    },

    #[error("Could not write {path}: {message}")]
    FileWrite {
        path: PathBuf,
        message: String,
    },

    #[error("Model launch failed: {message}")]
    Launch {
        message: String,
    },

    #[error("Coupling channel error: {message}")]
    Channel {
        message: String,
    },
}

/// Top-level error type for lpjml-config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("External error: {0}")]
    External(#[from] ExternalError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ConfigError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a process or filesystem error.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error is retryable.
    ///
    /// Configuration errors never are: the caller has to fix the descriptor
    /// or the arguments and call again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Returns the validation error, if this is one.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for lpjml-config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_output_lists_every_id() {
        let err = ValidationError::UnknownOutput {
            ids: vec!["foo".to_string(), "bar".to_string()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("foo"));
        assert!(msg.contains("bar"));
    }

    #[test]
    fn test_length_mismatch_message() {
        let err = ValidationError::LengthMismatch {
            outputs: 3,
            resolutions: 2,
        };
        assert_eq!(
            format!("{err}"),
            "3 outputs but 2 temporal resolutions were given"
        );
    }

    #[test]
    fn test_preprocess_error_carries_status_and_stderr() {
        let err = ExternalError::Preprocess {
            command: "cpp".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "lpjml.js: No such file".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("exit status: 1"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_config_error_from_validation() {
        let err: ConfigError = ValidationError::MissingArgument {
            operation: "set_startfrom",
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_external());
        assert!(!err.is_retryable());
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_config_error_from_external() {
        let err: ConfigError = ExternalError::PreprocessTimeout {
            command: "cpp".to_string(),
            duration_ms: 5000,
        }
        .into();
        assert!(err.is_external());
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("5000ms"));
    }

    #[test]
    fn test_internal_error() {
        let err = ConfigError::internal("broken invariant");
        assert!(err.is_internal());
        assert!(err.as_validation().is_none());
        assert!(format!("{err}").contains("broken invariant"));
    }
}
