// fairlens-core/src/infrastructure/config/project.rs

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

use super::rules::RulesFile;
use crate::domain::bias::AnalysisConfiguration;
use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(rename = "config-paths", default)]
    pub config_paths: Vec<String>,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub analysis: AnalysisDefaults,

    /// Hydrated from the `rules.yml` satellite, never read from the main file.
    #[serde(skip)]
    pub rules: RulesFile,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Canned responses file, relative to the project dir. Replaces HTTP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            timeout_secs: default_timeout_secs(),
            fixture: None,
        }
    }
}

impl BackendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default run inputs. Every field can be overridden from the CLI.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AnalysisDefaults {
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default)]
    pub sensitive_columns: Vec<String>,
    #[serde(default)]
    pub llm_enabled: bool,
    #[serde(default)]
    pub llm_prompt: Option<String>,
    #[serde(default)]
    pub simulation_enabled: bool,
}

impl AnalysisDefaults {
    /// Missing identifiers become empty strings, which validation rejects.
    pub fn to_configuration(&self) -> AnalysisConfiguration {
        AnalysisConfiguration {
            dataset_id: self.dataset_id.clone().unwrap_or_default(),
            target_column: self.target_column.clone().unwrap_or_default(),
            sensitive_columns: self.sensitive_columns.clone(),
            llm_enabled: self.llm_enabled,
            llm_prompt: self.llm_prompt.clone(),
            simulation_enabled: self.simulation_enabled,
        }
    }
}

fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_target_path() -> String {
    "target".to_string()
}
fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

// --- LOADER ---

#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    // 1. Locate the main file
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    // 2. Base YAML
    let mut config: ProjectConfig = load_fragment(&config_path)?;

    // 3. Satellites (fail-secure: a broken rules file stops everything)
    if let Some(config_folder) = config.config_paths.first() {
        let config_dir = project_dir.join(config_folder);
        if config_dir.exists() {
            load_satellite_configs(&mut config, &config_dir)?;
        }
    }

    // 4. Environment layering, e.g. FAIRLENS_BACKEND_URL=http://staging fairlens run
    apply_overrides(&mut config, |key| std::env::var(key).ok());

    if config.backend.timeout_secs == 0 {
        return Err(InfrastructureError::ConfigError(
            "backend.timeout_secs must be greater than zero".to_string(),
        ));
    }

    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    let candidates = ["fairlens.yaml", "fairlens_project.yaml"];
    for filename in candidates {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, candidates
    )))
}

/// Loads a typed configuration fragment from a YAML file.
fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| {
        InfrastructureError::ConfigError(format!("Failed to parse {:?}: {}", path, e))
    })
}

fn load_satellite_configs(
    config: &mut ProjectConfig,
    config_dir: &Path,
) -> Result<(), InfrastructureError> {
    let rules_path = config_dir.join("rules.yml");
    if rules_path.exists() {
        config.rules = load_fragment(&rules_path)?;
        info!(
            overrides = config.rules.overrides.len(),
            custom = config.rules.custom.len(),
            "Rule configuration loaded"
        );
    }
    Ok(())
}

fn apply_overrides(config: &mut ProjectConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("FAIRLENS_BACKEND_URL") {
        info!(old = ?config.backend.url, new = ?val, "Overriding backend URL via ENV");
        config.backend.url = val;
    }
    if let Some(val) = lookup("FAIRLENS_TARGET_PATH") {
        info!(old = ?config.target_path, new = ?val, "Overriding target path via ENV");
        config.target_path = val;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    const PROJECT_YAML: &str = r#"
name: credit-audit
version: "2.1"
config-paths: ["config"]
backend:
  url: http://analysis.internal:9000
  timeout_secs: 5
analysis:
  dataset_id: loans_2024
  target_column: approved
  sensitive_columns: [gender, age_band]
  llm_enabled: true
"#;

    #[test]
    fn test_load_with_satellite_rules() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("fairlens.yaml"), PROJECT_YAML)?;
        fs::create_dir(dir.path().join("config"))?;
        fs::write(
            dir.path().join("config/rules.yml"),
            "overrides:\n  - id: geographic_fairness\n    enabled: true\n",
        )?;

        let config = load_project_config(dir.path())?;

        assert_eq!(config.name, "credit-audit");
        assert_eq!(config.target_path, "target");
        assert_eq!(config.backend.timeout(), Duration::from_secs(5));
        assert_eq!(config.rules.overrides.len(), 1);

        let analysis = config.analysis.to_configuration();
        assert_eq!(analysis.sensitive_columns, vec!["gender", "age_band"]);
        assert!(analysis.llm_enabled);
        assert!(analysis.ensure_valid().is_ok());
        Ok(())
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_project_config(dir.path()),
            Err(InfrastructureError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_broken_rules_file_aborts_loading() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("fairlens.yaml"), PROJECT_YAML)?;
        fs::create_dir(dir.path().join("config"))?;
        fs::write(dir.path().join("config/rules.yml"), "overrides: [ {")?;

        assert!(matches!(
            load_project_config(dir.path()),
            Err(InfrastructureError::ConfigError(_))
        ));
        Ok(())
    }

    #[test]
    fn test_defaults_and_overrides() -> Result<()> {
        let mut config: ProjectConfig = serde_yaml::from_str("name: minimal")?;
        assert_eq!(config.backend.url, "http://localhost:8000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert!(config.analysis.to_configuration().ensure_valid().is_err());

        apply_overrides(&mut config, |key| match key {
            "FAIRLENS_BACKEND_URL" => Some("http://staging:8000".to_string()),
            _ => None,
        });
        assert_eq!(config.backend.url, "http://staging:8000");
        assert_eq!(config.target_path, "target");
        Ok(())
    }
}
