// fairlens-core/src/domain/bias/configuration.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationError};

use crate::domain::error::DomainError;

/// User input for one analysis run.
///
/// The enabled rule set is not stored here: it is snapshotted from the
/// catalog by the orchestrator when the run starts.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default, PartialEq)]
#[validate(schema(function = "validate_columns"))]
pub struct AnalysisConfiguration {
    #[validate(length(min = 1, message = "dataset_id is required"))]
    pub dataset_id: String,

    #[validate(length(min = 1, message = "target_column is required"))]
    pub target_column: String,

    #[validate(length(min = 1, message = "at least one sensitive column is required"))]
    pub sensitive_columns: Vec<String>,

    #[serde(default)]
    pub llm_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_prompt: Option<String>,

    #[serde(default)]
    pub simulation_enabled: bool,
}

impl AnalysisConfiguration {
    pub fn new(
        dataset_id: impl Into<String>,
        target_column: impl Into<String>,
        sensitive_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            target_column: target_column.into(),
            sensitive_columns: sensitive_columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_llm(mut self, prompt: Option<String>) -> Self {
        self.llm_enabled = true;
        self.llm_prompt = prompt;
        self
    }

    pub fn with_simulation(mut self) -> Self {
        self.simulation_enabled = true;
        self
    }

    pub fn scope(&self) -> AnalysisScope<'_> {
        AnalysisScope {
            dataset_id: &self.dataset_id,
            target_column: &self.target_column,
            sensitive_columns: &self.sensitive_columns,
        }
    }

    /// Checks the run invariants. Nothing is started when this fails.
    pub fn ensure_valid(&self) -> Result<(), DomainError> {
        self.validate()
            .map_err(|e| DomainError::Validation(e.to_string()))
    }
}

/// Borrowed view of the columns a stage operates on.
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct AnalysisScope<'a> {
    pub dataset_id: &'a str,
    pub target_column: &'a str,
    pub sensitive_columns: &'a [String],
}

fn validate_columns(cfg: &AnalysisConfiguration) -> Result<(), ValidationError> {
    if cfg.dataset_id.trim().is_empty() {
        return Err(ValidationError::new("blank_dataset_id")
            .with_message("dataset_id cannot be blank".into()));
    }
    if cfg.target_column.trim().is_empty() {
        return Err(ValidationError::new("blank_target_column")
            .with_message("target_column cannot be blank".into()));
    }

    let mut seen = HashSet::new();
    for col in &cfg.sensitive_columns {
        if col.trim().is_empty() {
            return Err(ValidationError::new("blank_sensitive_column")
                .with_message("sensitive column names cannot be blank".into()));
        }
        if *col == cfg.target_column {
            return Err(ValidationError::new("target_is_sensitive").with_message(
                format!("target column '{}' cannot also be sensitive", col).into(),
            ));
        }
        if !seen.insert(col.as_str()) {
            return Err(ValidationError::new("duplicate_sensitive_column")
                .with_message(format!("sensitive column '{}' is listed twice", col).into()));
        }
    }
    Ok(())
}
