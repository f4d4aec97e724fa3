// fairlens-core/src/domain/bias/mod.rs

pub mod aggregator;
pub mod catalog;
pub mod configuration;
pub mod report;
pub mod rule;

// Re-exports
pub use aggregator::{ResultAggregator, StageOutputs};
pub use catalog::{EnabledRules, RuleCatalog};
pub use configuration::{AnalysisConfiguration, AnalysisScope};
pub use report::{
    AnalysisReport, ConsolidatedResult, DatasetValidation, Issue, LlmInsights, RuleResult,
    Scenario, SimulationResults,
};
pub use rule::{Rule, RuleCategory, RulePatch, RuleSeverity};
