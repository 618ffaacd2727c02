//! Error types
//!
//! Library-level errors for the migration core. Application glue (CLI, TUI
//! bootstrap, config files) wraps these in `anyhow` with context.

use thiserror::Error;

/// Result alias for the migration core
pub type Result<T> = std::result::Result<T, MigratorError>;

/// Errors raised by the migration core
#[derive(Debug, Error)]
pub enum MigratorError {
    /// A field name that the form does not know about
    #[error("unknown form field: {0}")]
    UnknownField(String),

    /// A value of the wrong shape for a field (e.g. text for a checkbox)
    #[error("field '{field}' expects {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    /// A value of the right shape that is not acceptable for the field
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// A wizard action that is not defined for the current step
    #[error("cannot {action} from the {step} step")]
    InvalidTransition {
        action: &'static str,
        step: &'static str,
    },

    /// A launch or reset attempted while a stream is still in flight
    #[error("a migration is still in flight")]
    SessionInFlight,

    /// The migration service could not be reached at all
    #[error("could not reach migration service: {0}")]
    Connect(String),

    /// The launch request was sent but no stream was established
    #[error("migration service rejected the launch: {0}")]
    Launch(String),

    /// The stream broke while being read
    #[error("stream interrupted: {0}")]
    Transport(String),

    /// The operator aborted the running migration
    #[error("migration aborted by operator")]
    Cancelled,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Stable, machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UnknownField,
    TypeMismatch,
    InvalidValue,
    InvalidTransition,
    SessionInFlight,
    Connect,
    Launch,
    Transport,
    Cancelled,
    Config,
    Io,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownField => "E_UNKNOWN_FIELD",
            Self::TypeMismatch => "E_TYPE_MISMATCH",
            Self::InvalidValue => "E_INVALID_VALUE",
            Self::InvalidTransition => "E_INVALID_TRANSITION",
            Self::SessionInFlight => "E_SESSION_IN_FLIGHT",
            Self::Connect => "E_CONNECT",
            Self::Launch => "E_LAUNCH",
            Self::Transport => "E_TRANSPORT",
            Self::Cancelled => "E_CANCELLED",
            Self::Config => "E_CONFIG",
            Self::Io => "E_IO",
        }
    }
}

impl MigratorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownField(_) => ErrorCode::UnknownField,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::InvalidValue { .. } => ErrorCode::InvalidValue,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::SessionInFlight => ErrorCode::SessionInFlight,
            Self::Connect(_) => ErrorCode::Connect,
            Self::Launch(_) => ErrorCode::Launch,
            Self::Transport(_) => ErrorCode::Transport,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Config(_) => ErrorCode::Config,
            Self::Io(_) => ErrorCode::Io,
        }
    }
}

impl From<reqwest::Error> for MigratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Transport(err.to_string())
        } else {
            Self::Launch(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MigratorError::UnknownField("x".into()).code(),
            ErrorCode::UnknownField
        );
        assert_eq!(MigratorError::SessionInFlight.code().as_str(), "E_SESSION_IN_FLIGHT");
        assert_eq!(MigratorError::Cancelled.code(), ErrorCode::Cancelled);
    }

    #[test]
    fn test_display() {
        let err = MigratorError::InvalidTransition {
            action: "launch",
            step: "source",
        };
        assert_eq!(err.to_string(), "cannot launch from the source step");

        let err = MigratorError::TypeMismatch {
            field: "visual",
            expected: "a checkbox state",
        };
        assert_eq!(err.to_string(), "field 'visual' expects a checkbox state");
    }
}
