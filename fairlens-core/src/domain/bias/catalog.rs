// fairlens-core/src/domain/bias/catalog.rs

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use super::rule::{Rule, RuleCategory, RulePatch, RuleSeverity};
use crate::domain::error::DomainError;

fn re_rule_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_]*$").unwrap_or_else(|_| {
            // Hardcoded pattern, cannot fail.
            Regex::new("$^").unwrap_or_else(|_| unreachable!())
        })
    })
}

/// Frozen copy of the rules that were enabled when a run started.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnabledRules(Arc<[Rule]>);

impl EnabledRules {
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Rule] {
        &self.0
    }

    pub fn ids(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.id.as_str()).collect()
    }
}

impl From<Vec<Rule>> for EnabledRules {
    fn from(rules: Vec<Rule>) -> Self {
        Self(rules.into())
    }
}

impl<'a> IntoIterator for &'a EnabledRules {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Built-in and user-defined fairness rules, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    /// Catalog pre-populated with the built-in rules.
    ///
    /// High-severity correctness checks start enabled; exploratory or
    /// expensive ones (individual, temporal, geographic) start disabled.
    pub fn initialize() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Appends a user-defined rule. Only `custom` rules may be added.
    pub fn add(&mut self, rule: Rule) -> Result<(), DomainError> {
        if rule.category != RuleCategory::Custom {
            return Err(DomainError::Validation(format!(
                "Rule '{}' has category '{}'; only custom rules can be added",
                rule.id, rule.category
            )));
        }
        if !re_rule_id().is_match(&rule.id) {
            return Err(DomainError::Validation(format!(
                "Invalid rule id '{}': expected lowercase letters, digits and underscores",
                rule.id
            )));
        }
        if rule.name.trim().is_empty() {
            return Err(DomainError::Validation(format!(
                "Rule '{}' must have a name",
                rule.id
            )));
        }
        if self.get(&rule.id).is_some() {
            return Err(DomainError::Validation(format!(
                "Rule id '{}' already exists in catalog",
                rule.id
            )));
        }

        tracing::debug!(rule = %rule.id, "Custom rule added");
        self.rules.push(rule);
        Ok(())
    }

    pub fn update(&mut self, rule_id: &str, patch: RulePatch) -> Result<&Rule, DomainError> {
        if let Some(name) = &patch.name
            && name.trim().is_empty()
        {
            return Err(DomainError::Validation(format!(
                "Rule '{}' must have a name",
                rule_id
            )));
        }

        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| DomainError::NotFound(rule_id.to_string()))?;
        rule.apply(patch);
        Ok(rule)
    }

    /// Removes a custom rule. Built-ins can only be disabled.
    pub fn remove(&mut self, rule_id: &str) -> Result<Rule, DomainError> {
        let idx = self
            .rules
            .iter()
            .position(|r| r.id == rule_id)
            .ok_or_else(|| DomainError::NotFound(rule_id.to_string()))?;

        if !self.rules[idx].is_custom() {
            return Err(DomainError::Validation(format!(
                "Built-in rule '{}' cannot be removed, disable it instead",
                rule_id
            )));
        }

        Ok(self.rules.remove(idx))
    }

    pub fn enabled_snapshot(&self) -> EnabledRules {
        self.rules
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect::<Vec<_>>()
            .into()
    }
}

#[allow(clippy::too_many_arguments)]
fn builtin(
    id: &str,
    name: &str,
    description: &str,
    category: RuleCategory,
    severity: RuleSeverity,
    enabled: bool,
    parameters: &[(&str, f64)],
    formula: &str,
) -> Rule {
    Rule {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        severity,
        enabled,
        parameters: parameters
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
        formula: Some(formula.to_string()),
    }
}

fn builtin_rules() -> Vec<Rule> {
    vec![
        builtin(
            "statistical_parity",
            "Statistical Parity",
            "Positive outcome rates must be similar across sensitive groups",
            RuleCategory::Statistical,
            RuleSeverity::High,
            true,
            &[("threshold", 0.1)],
            "|P(Y=1|A=a) - P(Y=1|A=b)| <= threshold",
        ),
        builtin(
            "demographic_parity",
            "Demographic Parity",
            "Ratio of selection rates between least and most favoured groups (80% rule)",
            RuleCategory::Demographic,
            RuleSeverity::High,
            true,
            &[("threshold", 0.8)],
            "min_g P(Y=1|A=g) / max_g P(Y=1|A=g) >= threshold",
        ),
        builtin(
            "equal_opportunity",
            "Equal Opportunity",
            "True positive rates must be similar across sensitive groups",
            RuleCategory::Statistical,
            RuleSeverity::Critical,
            true,
            &[("threshold", 0.1)],
            "|TPR_a - TPR_b| <= threshold",
        ),
        builtin(
            "individual_fairness",
            "Individual Fairness",
            "Similar individuals must receive similar predictions",
            RuleCategory::Behavioral,
            RuleSeverity::Medium,
            false,
            &[("lipschitz_constant", 1.0), ("sample_size", 1000.0)],
            "d(f(x), f(x')) <= L * d(x, x')",
        ),
        builtin(
            "temporal_fairness",
            "Temporal Fairness",
            "Group outcome gaps must stay stable across time windows",
            RuleCategory::Temporal,
            RuleSeverity::Medium,
            false,
            &[("threshold", 0.05), ("window_days", 30.0)],
            "max_t |gap(t) - gap(t-1)| <= threshold",
        ),
        builtin(
            "geographic_fairness",
            "Geographic Fairness",
            "Outcome rates must be consistent across regions",
            RuleCategory::Geographic,
            RuleSeverity::Low,
            false,
            &[("threshold", 0.15)],
            "max_r P(Y=1|R=r) - min_r P(Y=1|R=r) <= threshold",
        ),
    ]
}
