// fairlens-core/src/infrastructure/config/rules.rs

use serde::{Deserialize, Serialize};

use crate::domain::bias::{Rule, RuleCatalog, RulePatch};
use crate::domain::error::DomainError;

/// Content of the `rules.yml` satellite file.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct RulesFile {
    /// Partial updates of existing (usually built-in) rules.
    #[serde(default)]
    pub overrides: Vec<RuleOverride>,
    /// User-defined rules appended to the catalog.
    #[serde(default)]
    pub custom: Vec<Rule>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuleOverride {
    pub id: String,
    #[serde(flatten)]
    pub patch: RulePatch,
}

impl RulesFile {
    /// Builds the session catalog: built-ins, then overrides, then custom rules.
    pub fn build_catalog(&self) -> Result<RuleCatalog, DomainError> {
        let mut catalog = RuleCatalog::initialize();
        self.apply_to(&mut catalog)?;
        Ok(catalog)
    }

    pub fn apply_to(&self, catalog: &mut RuleCatalog) -> Result<(), DomainError> {
        for ov in &self.overrides {
            catalog.update(&ov.id, ov.patch.clone())?;
        }
        for rule in &self.custom {
            catalog.add(rule.clone())?;
        }
        Ok(())
    }
}
