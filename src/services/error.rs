//! Errors surfaced by manual organization requests

use thiserror::Error;

use crate::db::OrganizationStatus;

#[derive(Debug, Error)]
pub enum OrganizationError {
    /// The attempt ended in a status other than success
    #[error("Organization ended with status {status}: {message}")]
    Failed {
        status: OrganizationStatus,
        message: String,
    },

    #[error("File is currently being processed ({id}), try again later")]
    InProgress { id: String },

    #[error("Organization result not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type OrganizationOutcome<T> = std::result::Result<T, OrganizationError>;
