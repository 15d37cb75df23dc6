use thiserror::Error;

use crate::validation::ValidationReport;

/// Failures the collection service can report.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The payload does not match the item schema.
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    /// No stored item has the requested id.
    #[error("item with id={id} not found")]
    NotFound { id: String },

    /// Anything else. Only the message is ever shown to clients.
    #[error("{0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
