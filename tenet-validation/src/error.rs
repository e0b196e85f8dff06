//! Error types for validation, acknowledgment and the write pipeline

use tenet_core::{ConfigError, QueryError};
use tenet_dsl::ExpressionError;
use tenet_hooks::HookError;
use thiserror::Error;

/// Failures raised while building or running a validator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidatorError {
    #[error("Validator type '{validator_type}' is not registered. Available types: {}", .available.join(", "))]
    UnknownType {
        validator_type: String,
        available: Vec<String>,
    },

    #[error("Invalid parameters for '{validator_type}': {reason}")]
    InvalidParams {
        validator_type: String,
        reason: String,
    },

    #[error("Query failed: {0}")]
    Query(#[from] QueryError),

    /// A guard or condition failed to evaluate under the reject policy.
    #[error("Guard failed to evaluate: {source}")]
    Guard {
        #[source]
        source: ExpressionError,
    },

    #[error("{message}")]
    Failed { message: String },
}

impl ValidatorError {
    pub fn invalid_params(validator_type: &str, reason: impl Into<String>) -> Self {
        ValidatorError::InvalidParams {
            validator_type: validator_type.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ValidatorError::Failed {
            message: message.into(),
        }
    }
}

/// Why an acknowledgment token was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcknowledgmentError {
    #[error("Acknowledgment token has expired")]
    Expired,

    #[error("Invalid acknowledgment token: {reason}")]
    Invalid { reason: String },

    #[error("Record data or warnings have changed since acknowledgment")]
    DataChanged,
}

impl AcknowledgmentError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        AcknowledgmentError::Invalid {
            reason: reason.into(),
        }
    }

    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            AcknowledgmentError::Expired => "ACKNOWLEDGMENT_EXPIRED",
            AcknowledgmentError::Invalid { .. } => "INVALID_ACKNOWLEDGMENT",
            AcknowledgmentError::DataChanged => "DATA_CHANGED",
        }
    }

    /// HTTP-style status for transport layers.
    pub fn status_code(&self) -> u16 {
        match self {
            AcknowledgmentError::DataChanged => 409,
            AcknowledgmentError::Expired | AcknowledgmentError::Invalid { .. } => 422,
        }
    }

    /// What the caller should do next.
    pub fn user_message(&self) -> &'static str {
        match self {
            AcknowledgmentError::Expired => "Acknowledgment expired. Please review the warnings again.",
            AcknowledgmentError::Invalid { .. } => "Invalid acknowledgment. Please try again.",
            AcknowledgmentError::DataChanged => "Data has changed. Please review the warnings again.",
        }
    }
}

/// Master error for a record operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Validator '{validator}' failed: {source}")]
    Validator {
        validator: String,
        #[source]
        source: ValidatorError,
    },

    #[error("Guard for {rule} failed to evaluate: {source}")]
    Guard {
        rule: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Default for '{field}' failed to evaluate: {source}")]
    Default {
        field: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Failed to load configured validators for {entity}: {source}")]
    Loader {
        entity: String,
        #[source]
        source: ValidatorError,
    },

    #[error(transparent)]
    Hook(HookError),

    #[error(transparent)]
    Acknowledgment(#[from] AcknowledgmentError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Wrap a validator failure, lifting guard failures to [`EngineError::Guard`].
    pub fn from_validator(validator: &str, source: ValidatorError) -> Self {
        match source {
            ValidatorError::Guard { source } => EngineError::Guard {
                rule: format!("validator '{}'", validator),
                source,
            },
            source => EngineError::Validator {
                validator: validator.to_string(),
                source,
            },
        }
    }
}

impl From<HookError> for EngineError {
    fn from(error: HookError) -> Self {
        match error {
            HookError::Guard { hook, source } => EngineError::Guard {
                rule: format!("hook '{}'", hook),
                source,
            },
            other => EngineError::Hook(other),
        }
    }
}

pub type ValidatorResult<T> = Result<T, ValidatorError>;
pub type AcknowledgmentResult<T> = Result<T, AcknowledgmentError>;
pub type EngineResult<T> = Result<T, EngineError>;
