//! Error types for TENET core operations

use thiserror::Error;

/// Errors raised by a query capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query against {entity} failed: {reason}")]
    Backend { entity: String, reason: String },

    #[error("Unknown entity: {entity}")]
    UnknownEntity { entity: String },

    #[error("Invalid filter: {reason}")]
    InvalidFilter { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read configuration from {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

pub type QueryResult<T> = Result<T, QueryError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
