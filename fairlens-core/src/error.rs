// fairlens-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FairlensError {
    // --- DOMAIN ERRORS (validation, stage failures, concurrency) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, parsing, transport) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl FairlensError {
    /// Returns the domain error, if this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            FairlensError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FairlensError {
    fn from(err: std::io::Error) -> Self {
        FairlensError::Infrastructure(InfrastructureError::Io(err))
    }
}
