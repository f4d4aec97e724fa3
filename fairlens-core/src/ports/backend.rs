// fairlens-core/src/ports/backend.rs

// Contract with the remote analysis service. The core only knows these
// shapes; transport lives in infrastructure::adapters.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::Detail;
use crate::domain::bias::{
    AnalysisConfiguration, AnalysisScope, ConsolidatedResult, DatasetValidation, LlmInsights, Rule,
    RuleResult, SimulationResults,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Backend returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Unexpected backend payload: {0}")]
    Decode(String),

    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Rejected(String),
}

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn validate_dataset(&self, dataset_id: &str) -> Result<DatasetValidation, BackendError>;

    async fn run_statistical_analysis(
        &self,
        scope: AnalysisScope<'_>,
    ) -> Result<Detail, BackendError>;

    async fn evaluate_rules(
        &self,
        scope: AnalysisScope<'_>,
        rules: &[Rule],
    ) -> Result<Vec<RuleResult>, BackendError>;

    async fn run_llm_analysis(
        &self,
        scope: AnalysisScope<'_>,
        prompt: Option<&str>,
    ) -> Result<LlmInsights, BackendError>;

    async fn run_simulation(
        &self,
        scope: AnalysisScope<'_>,
    ) -> Result<SimulationResults, BackendError>;

    async fn run_consolidated_analysis(
        &self,
        config: &AnalysisConfiguration,
        rules: &[Rule],
    ) -> Result<ConsolidatedResult, BackendError>;
}
