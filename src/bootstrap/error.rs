use super::unit::Phase;
use crate::config::ConfigError;
use crate::core::DbError;
use thiserror::Error;

/// Failures while turning a configuration reference into an open session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Configuration resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Failed to read configuration resource '{resource}': {source}")]
    ResourceUnreadable {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration resource '{resource}': {reason}")]
    MalformedResource { resource: String, reason: String },

    #[error("Invalid connection settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Cannot resolve bootstrap unit '{unit}': {reason}")]
    Discovery { unit: String, reason: String },

    #[error("{phase} operation '{operation}' of unit '{unit}' failed: {source:#}")]
    OperationFailed {
        unit: String,
        phase: Phase,
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("No session for {phase} operation '{operation}' of unit '{unit}': {source}")]
    SessionAcquisition {
        unit: String,
        phase: Phase,
        operation: String,
        #[source]
        source: SessionError,
    },

    #[error("Operation '{operation}' of unit '{unit}' needs a session but the unit has no configuration")]
    MissingSession { unit: String, operation: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    /// Whether the failure prevents the rest of a unit's operations in the
    /// same phase from running.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            BootstrapError::SessionAcquisition { .. } | BootstrapError::MissingSession { .. }
        )
    }
}
