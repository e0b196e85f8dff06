//! Hook error types

use tenet_core::QueryError;
use tenet_dsl::ExpressionError;
use thiserror::Error;

/// Failures raised by hooks and by the hook service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HookError {
    /// Returned by a hook implementation.
    #[error("{message}")]
    Failed { message: String },

    #[error("Query failed: {0}")]
    Query(#[from] QueryError),

    /// A hook failed outside `afterCommit`; the operation must abort.
    #[error("Hook '{hook}' failed: {reason}")]
    Execution { hook: String, reason: String },

    /// A `when` guard failed to evaluate under the reject policy.
    #[error("Guard for hook '{hook}' failed: {source}")]
    Guard {
        hook: String,
        #[source]
        source: ExpressionError,
    },
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed {
            message: message.into(),
        }
    }
}

pub type HookServiceResult<T> = Result<T, HookError>;
