// fairlens-core/src/domain/stage/registry.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::domain::bias::AnalysisConfiguration;

// Declaration order is pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageId {
    DataValidation,
    StatisticalAnalysis,
    CustomRules,
    LlmAnalysis,
    Simulation,
    ReportGeneration,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataValidation => "data-validation",
            Self::StatisticalAnalysis => "statistical-analysis",
            Self::CustomRules => "custom-rules",
            Self::LlmAnalysis => "llm-analysis",
            Self::Simulation => "simulation",
            Self::ReportGeneration => "report-generation",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data-validation" => Ok(Self::DataValidation),
            "statistical-analysis" => Ok(Self::StatisticalAnalysis),
            "custom-rules" => Ok(Self::CustomRules),
            "llm-analysis" => Ok(Self::LlmAnalysis),
            "simulation" => Ok(Self::Simulation),
            "report-generation" => Ok(Self::ReportGeneration),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// Feature toggle an optional stage depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureGate {
    Llm,
    Simulation,
}

impl FeatureGate {
    pub fn is_open(&self, config: &AnalysisConfiguration) -> bool {
        match self {
            Self::Llm => config.llm_enabled,
            Self::Simulation => config.simulation_enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub id: StageId,
    pub name: &'static str,
    pub description: &'static str,
    /// `Some` for optional stages.
    pub gate: Option<FeatureGate>,
    /// Display hint only.
    pub estimated_duration: Duration,
}

impl Stage {
    pub fn is_optional(&self) -> bool {
        self.gate.is_some()
    }
}

/// Fixed, ordered list of pipeline stages.
#[derive(Debug, Clone)]
pub struct StageRegistry {
    stages: Vec<Stage>,
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl StageRegistry {
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Stage {
                    id: StageId::DataValidation,
                    name: "Data Validation",
                    description: "Check that the dataset exists and is usable",
                    gate: None,
                    estimated_duration: Duration::from_secs(2),
                },
                Stage {
                    id: StageId::StatisticalAnalysis,
                    name: "Statistical Analysis",
                    description: "Compute group statistics for the sensitive columns",
                    gate: None,
                    estimated_duration: Duration::from_secs(5),
                },
                Stage {
                    id: StageId::CustomRules,
                    name: "Custom Rules",
                    description: "Evaluate the enabled fairness rules",
                    gate: None,
                    estimated_duration: Duration::from_secs(3),
                },
                Stage {
                    id: StageId::LlmAnalysis,
                    name: "LLM Analysis",
                    description: "Contextual bias review by a language model",
                    gate: Some(FeatureGate::Llm),
                    estimated_duration: Duration::from_secs(10),
                },
                Stage {
                    id: StageId::Simulation,
                    name: "Simulation",
                    description: "What-if scenarios on the sensitive attributes",
                    gate: Some(FeatureGate::Simulation),
                    estimated_duration: Duration::from_secs(8),
                },
                Stage {
                    id: StageId::ReportGeneration,
                    name: "Report Generation",
                    description: "Consolidated analysis and final report",
                    gate: None,
                    estimated_duration: Duration::from_secs(2),
                },
            ],
        }
    }

    pub fn all(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages that apply to `config`. Optional stages whose feature is off
    /// are left out entirely.
    pub fn ordered_stages(&self, config: &AnalysisConfiguration) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|s| s.gate.is_none_or(|gate| gate.is_open(config)))
            .copied()
            .collect()
    }

    /// One-line rendering of the plan, e.g. for logs.
    pub fn plan(&self, config: &AnalysisConfiguration) -> String {
        self.ordered_stages(config)
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
