// fairlens-core/src/domain/bias/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rule::RuleSeverity;
use crate::domain::detail::Detail;

// --- BACKEND PAYLOADS ---

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DatasetValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleResult {
    pub rule_id: String,
    pub passed: bool,
    pub score: f64,
    /// False only for placeholders of rules the backend did not report on.
    #[serde(default = "evaluated_by_default")]
    pub evaluated: bool,
    #[serde(default)]
    pub detail: Detail,
}

fn evaluated_by_default() -> bool {
    true
}

impl RuleResult {
    /// Placeholder for an enabled rule the backend did not report on.
    pub fn not_evaluated(rule_id: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            passed: false,
            score: 0.0,
            evaluated: false,
            detail: Detail::new()
                .with("status", "not evaluated")
                .with("reason", "rule missing from backend response"),
        }
    }

    pub fn was_evaluated(&self) -> bool {
        self.evaluated
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct LlmInsights {
    pub summary: String,
    #[serde(default)]
    pub contextual_recommendations: Vec<String>,
    pub risk_assessment: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub impact: f64,
    #[serde(default)]
    pub detail: Detail,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SimulationResults {
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    pub overall_impact: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Issue {
    #[serde(default)]
    pub severity: RuleSeverity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub affected_groups: Vec<String>,
}

/// Authoritative result of the consolidated backend analysis.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ConsolidatedResult {
    pub overall_score: f64,
    #[serde(default)]
    pub per_rule: Vec<RuleResult>,
    #[serde(default)]
    pub issues_found: Vec<Issue>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

// --- FINAL REPORT ---

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalysisReport {
    pub dataset_id: String,
    pub overall_score: f64,
    pub per_rule_results: Vec<RuleResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_insights: Option<LlmInsights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_results: Option<SimulationResults>,
    pub issues_found: Vec<Issue>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn passed_rules(&self) -> usize {
        self.per_rule_results.iter().filter(|r| r.passed).count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
