// fairlens-core/src/domain/bias/rule.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Statistical,
    Demographic,
    Behavioral,
    Temporal,
    Geographic,
    Custom,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statistical => "statistical",
            Self::Demographic => "demographic",
            Self::Behavioral => "behavioral",
            Self::Temporal => "temporal",
            Self::Geographic => "geographic",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Declaration order gives Low < Medium < High < Critical.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl RuleSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuleSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Unknown rule severity: {}", s)),
        }
    }
}

/// A named fairness check sent to the backend for evaluation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: RuleCategory,
    #[serde(default)]
    pub severity: RuleSeverity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    /// Display only, never evaluated locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

fn default_enabled() -> bool {
    true
}

// Rules declared in configuration files are user-defined unless stated.
fn default_category() -> RuleCategory {
    RuleCategory::Custom
}

impl Rule {
    /// Builds a user-defined rule. Custom rules are enabled on creation.
    pub fn custom(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: RuleCategory::Custom,
            severity: RuleSeverity::Medium,
            enabled: true,
            parameters: BTreeMap::new(),
            formula: None,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_severity(mut self, severity: RuleSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_custom(&self) -> bool {
        self.category == RuleCategory::Custom
    }

    /// Merges the fields present in `patch`. Parameters are merged key by key.
    pub fn apply(&mut self, patch: RulePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(severity) = patch.severity {
            self.severity = severity;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(parameters) = patch.parameters {
            self.parameters.extend(parameters);
        }
    }
}

/// Partial update of a [`Rule`]. Identity and category are not patchable.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct RulePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<RuleSeverity>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub parameters: Option<BTreeMap<String, f64>>,
}

impl RulePatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn parameter(key: impl Into<String>, value: f64) -> Self {
        Self {
            parameters: Some(BTreeMap::from([(key.into(), value)])),
            ..Self::default()
        }
    }
}
