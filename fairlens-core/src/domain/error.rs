// fairlens-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::stage::{StageId, StageStatus};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation Error: {0}")]
    #[diagnostic(
        code(fairlens::domain::validation),
        help("Fix the analysis configuration or rule definition and try again.")
    )]
    Validation(String),

    #[error("Rule '{0}' not found in catalog")]
    #[diagnostic(code(fairlens::domain::not_found))]
    NotFound(String),

    #[error("Stage '{stage_id}' failed: {message}")]
    #[diagnostic(
        code(fairlens::domain::stage_failure),
        help("The whole analysis must be restarted; partial resume is not supported.")
    )]
    StageFailure {
        stage_id: StageId,
        message: String,
        cancelled: bool,
    },

    #[error("An analysis run is already in progress")]
    #[diagnostic(
        code(fairlens::domain::concurrent_run),
        help("Wait for the current run to finish or cancel it first.")
    )]
    ConcurrentRun,

    #[error("Stage '{stage_id}' cannot move from {from} to {to}")]
    #[diagnostic(code(fairlens::domain::invalid_transition))]
    InvalidTransition {
        stage_id: StageId,
        from: StageStatus,
        to: StageStatus,
    },
}

impl DomainError {
    /// Stage that caused the failure, for `StageFailure` only.
    pub fn failed_stage(&self) -> Option<StageId> {
        match self {
            DomainError::StageFailure { stage_id, .. } => Some(*stage_id),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, DomainError::StageFailure { cancelled: true, .. })
    }
}
