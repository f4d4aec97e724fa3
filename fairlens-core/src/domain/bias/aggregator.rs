// fairlens-core/src/domain/bias/aggregator.rs

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::catalog::EnabledRules;
use super::report::{AnalysisReport, ConsolidatedResult, LlmInsights, RuleResult, SimulationResults};
use crate::domain::stage::{StageId, StageRun, StageStatus};

/// Payloads produced by the optional stages of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutputs {
    pub llm_insights: Option<LlmInsights>,
    pub simulation_results: Option<SimulationResults>,
}

pub struct ResultAggregator;

impl ResultAggregator {
    /// Builds the final report. Pure: no I/O, no state, no clock reads.
    ///
    /// * Every enabled rule appears exactly once in `per_rule_results`, in
    ///   snapshot order. Rules missing from the backend answer are reported
    ///   as failed placeholders with `evaluated: false`.
    /// * Optional stage payloads are only exposed when their stage completed.
    /// * `overall_score` is the backend's, verbatim.
    pub fn aggregate(
        dataset_id: &str,
        backend: ConsolidatedResult,
        enabled_rules: &EnabledRules,
        stages: &[StageRun],
        outputs: StageOutputs,
        generated_at: DateTime<Utc>,
    ) -> AnalysisReport {
        let mut by_id: HashMap<String, RuleResult> = HashMap::with_capacity(backend.per_rule.len());
        for result in backend.per_rule {
            if by_id.contains_key(&result.rule_id) {
                tracing::warn!(rule = %result.rule_id, "Duplicate rule result from backend, keeping the first");
                continue;
            }
            by_id.insert(result.rule_id.clone(), result);
        }

        let per_rule_results: Vec<RuleResult> = enabled_rules
            .iter()
            .map(|rule| {
                by_id.remove(&rule.id).unwrap_or_else(|| {
                    tracing::warn!(rule = %rule.id, "Enabled rule missing from backend result");
                    RuleResult::not_evaluated(&rule.id)
                })
            })
            .collect();

        if !by_id.is_empty() {
            tracing::debug!(extra = ?by_id.keys().collect::<Vec<_>>(), "Ignoring results for rules that were not enabled");
        }

        let completed = |id: StageId| {
            stages
                .iter()
                .any(|s| s.stage_id == id && s.status == StageStatus::Completed)
        };

        AnalysisReport {
            dataset_id: dataset_id.to_string(),
            overall_score: backend.overall_score,
            per_rule_results,
            llm_insights: outputs
                .llm_insights
                .filter(|_| completed(StageId::LlmAnalysis)),
            simulation_results: outputs
                .simulation_results
                .filter(|_| completed(StageId::Simulation)),
            issues_found: backend.issues_found,
            recommendations: backend.recommendations,
            generated_at,
        }
    }
}
