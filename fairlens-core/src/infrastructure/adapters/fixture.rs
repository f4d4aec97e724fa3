// fairlens-core/src/infrastructure/adapters/fixture.rs

// Offline backend answering from a canned YAML document. Used for dry runs
// and by the CLI integration tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::domain::Detail;
use crate::domain::bias::{
    AnalysisConfiguration, AnalysisScope, ConsolidatedResult, DatasetValidation, LlmInsights, Rule,
    RuleResult, SimulationResults,
};
use crate::infrastructure::error::InfrastructureError;
use crate::ports::backend::{AnalysisBackend, BackendError};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ValidateDataset,
    StatisticalAnalysis,
    EvaluateRules,
    LlmAnalysis,
    Simulation,
    ConsolidatedAnalysis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FixtureBackend {
    #[serde(default = "accepted")]
    validation: DatasetValidation,
    #[serde(default)]
    statistical: Detail,
    /// When absent every requested rule passes with a score of 1.0.
    #[serde(default)]
    rules: Option<Vec<RuleResult>>,
    #[serde(default)]
    llm: Option<LlmInsights>,
    #[serde(default)]
    simulation: Option<SimulationResults>,
    /// When absent it is derived from the rule results.
    #[serde(default)]
    consolidated: Option<ConsolidatedResult>,
    /// Operations that must fail, with the message to fail with.
    #[serde(default)]
    fail: BTreeMap<Operation, String>,
}

fn accepted() -> DatasetValidation {
    DatasetValidation {
        valid: true,
        reason: None,
    }
}

impl FixtureBackend {
    pub fn from_yaml(content: &str) -> Result<Self, InfrastructureError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, InfrastructureError> {
        let content = fs::read_to_string(path).map_err(|e| {
            InfrastructureError::ConfigError(format!("Cannot read fixture {:?}: {}", path, e))
        })?;
        Self::from_yaml(&content)
    }

    fn check(&self, op: Operation) -> Result<(), BackendError> {
        debug!(operation = ?op, "Fixture backend call");
        match self.fail.get(&op) {
            Some(message) => Err(BackendError::Rejected(message.clone())),
            None => Ok(()),
        }
    }

    fn rule_results(&self, rules: &[Rule]) -> Vec<RuleResult> {
        match &self.rules {
            Some(results) => results.clone(),
            None => rules
                .iter()
                .map(|r| RuleResult {
                    rule_id: r.id.clone(),
                    passed: true,
                    score: 1.0,
                    evaluated: true,
                    detail: Detail::new(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl AnalysisBackend for FixtureBackend {
    async fn validate_dataset(&self, _dataset_id: &str) -> Result<DatasetValidation, BackendError> {
        self.check(Operation::ValidateDataset)?;
        Ok(self.validation.clone())
    }

    async fn run_statistical_analysis(&self, _scope: AnalysisScope<'_>) -> Result<Detail, BackendError> {
        self.check(Operation::StatisticalAnalysis)?;
        Ok(self.statistical.clone())
    }

    async fn evaluate_rules(
        &self,
        _scope: AnalysisScope<'_>,
        rules: &[Rule],
    ) -> Result<Vec<RuleResult>, BackendError> {
        self.check(Operation::EvaluateRules)?;
        Ok(self.rule_results(rules))
    }

    async fn run_llm_analysis(
        &self,
        _scope: AnalysisScope<'_>,
        _prompt: Option<&str>,
    ) -> Result<LlmInsights, BackendError> {
        self.check(Operation::LlmAnalysis)?;
        self.llm
            .clone()
            .ok_or_else(|| BackendError::Rejected("fixture has no llm payload".into()))
    }

    async fn run_simulation(&self, _scope: AnalysisScope<'_>) -> Result<SimulationResults, BackendError> {
        self.check(Operation::Simulation)?;
        self.simulation
            .clone()
            .ok_or_else(|| BackendError::Rejected("fixture has no simulation payload".into()))
    }

    async fn run_consolidated_analysis(
        &self,
        _config: &AnalysisConfiguration,
        rules: &[Rule],
    ) -> Result<ConsolidatedResult, BackendError> {
        self.check(Operation::ConsolidatedAnalysis)?;
        if let Some(result) = &self.consolidated {
            return Ok(result.clone());
        }

        let per_rule = self.rule_results(rules);
        let overall_score = if per_rule.is_empty() {
            1.0
        } else {
            per_rule.iter().filter(|r| r.passed).count() as f64 / per_rule.len() as f64
        };
        Ok(ConsolidatedResult {
            overall_score,
            per_rule,
            ..ConsolidatedResult::default()
        })
    }
}
