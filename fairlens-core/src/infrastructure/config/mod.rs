// fairlens-core/src/infrastructure/config/mod.rs

pub mod project;
pub mod rules;

pub use project::{AnalysisDefaults, BackendSettings, ProjectConfig, load_project_config};
pub use rules::{RuleOverride, RulesFile};
