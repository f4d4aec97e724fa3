// fairlens-core/src/infrastructure/adapters/http.rs

// JSON-over-HTTP implementation of the AnalysisBackend port.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::domain::Detail;
use crate::domain::bias::{
    AnalysisConfiguration, AnalysisScope, ConsolidatedResult, DatasetValidation, LlmInsights, Rule,
    RuleResult, SimulationResults,
};
use crate::infrastructure::error::InfrastructureError;
use crate::ports::backend::{AnalysisBackend, BackendError};

pub struct HttpAnalysisBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

// --- REQUEST BODIES ---

#[derive(Serialize)]
struct ValidateRequest<'a> {
    dataset_id: &'a str,
}

#[derive(Serialize)]
struct RulesRequest<'a> {
    #[serde(flatten)]
    scope: AnalysisScope<'a>,
    rules: &'a [Rule],
}

#[derive(Serialize)]
struct LlmRequest<'a> {
    #[serde(flatten)]
    scope: AnalysisScope<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
}

#[derive(Serialize)]
struct ConsolidatedRequest<'a> {
    #[serde(flatten)]
    config: &'a AnalysisConfiguration,
    rules: &'a [Rule],
}

impl HttpAnalysisBackend {
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, InfrastructureError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(url = %url, "Calling analysis backend");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                code: status.as_u16(),
                body: error_message(&raw),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout)
            } else {
                BackendError::Decode(e.to_string())
            }
        })
    }

    fn classify(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Pulls `detail` or `message` out of a JSON error body, else returns it raw.
fn error_message(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| {
            ["detail", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| raw.trim().to_string())
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn validate_dataset(&self, dataset_id: &str) -> Result<DatasetValidation, BackendError> {
        self.post("datasets/validate", &ValidateRequest { dataset_id })
            .await
    }

    async fn run_statistical_analysis(&self, scope: AnalysisScope<'_>) -> Result<Detail, BackendError> {
        self.post("bias/statistical", &scope).await
    }

    async fn evaluate_rules(
        &self,
        scope: AnalysisScope<'_>,
        rules: &[Rule],
    ) -> Result<Vec<RuleResult>, BackendError> {
        self.post("bias/rules/evaluate", &RulesRequest { scope, rules })
            .await
    }

    async fn run_llm_analysis(
        &self,
        scope: AnalysisScope<'_>,
        prompt: Option<&str>,
    ) -> Result<LlmInsights, BackendError> {
        self.post("bias/llm", &LlmRequest { scope, prompt }).await
    }

    async fn run_simulation(&self, scope: AnalysisScope<'_>) -> Result<SimulationResults, BackendError> {
        self.post("bias/simulation", &scope).await
    }

    async fn run_consolidated_analysis(
        &self,
        config: &AnalysisConfiguration,
        rules: &[Rule],
    ) -> Result<ConsolidatedResult, BackendError> {
        self.post("bias/analyze", &ConsolidatedRequest { config, rules })
            .await
    }
}
