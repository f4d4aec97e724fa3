// fairlens-core/src/application/pipeline.rs

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::FairlensError;
use crate::ports::backend::{AnalysisBackend, BackendError};

// Domain
use crate::domain::Detail;
use crate::domain::bias::{
    AnalysisConfiguration, AnalysisReport, EnabledRules, ResultAggregator, RuleCatalog,
    StageOutputs,
};
use crate::domain::error::DomainError;
use crate::domain::stage::{StageId, StageRegistry, StageRun, StageTracker};

/// Error message recorded on the stage that was about to start when a run
/// got cancelled.
pub const CANCELLED_MESSAGE: &str = "analysis cancelled";

/// Rule catalog shared between the UI and the orchestrator.
pub type SharedCatalog = Arc<RwLock<RuleCatalog>>;

/// Runs the staged bias analysis, one run at a time.
///
/// Stages execute strictly in registry order; the first failure aborts the
/// run. Progress is observable through [`PipelineOrchestrator::snapshot`]
/// (polling) or [`PipelineOrchestrator::subscribe`] (push).
pub struct PipelineOrchestrator {
    backend: Arc<dyn AnalysisBackend>,
    registry: StageRegistry,
    catalog: SharedCatalog,
    tracker: Mutex<StageTracker>,
    progress: watch::Sender<Vec<StageRun>>,
    state: AtomicU8,
    stage_timeout: Option<Duration>,
}

// Run slot states. Claiming the slot and requesting a cancel are single
// compare-exchanges on the same word, so a cancel is never lost.
const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLING: u8 = 2;

// Releases the single-run slot, even when the run future is dropped.
struct RunGuard<'a>(&'a AtomicU8);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::SeqCst);
    }
}

// Outcome of one stage operation: detail for the tracker, or a message.
type StageResult = Result<Detail, String>;

impl PipelineOrchestrator {
    pub fn new(backend: Arc<dyn AnalysisBackend>, catalog: SharedCatalog) -> Self {
        let (progress, _) = watch::channel(Vec::new());
        Self {
            backend,
            registry: StageRegistry::standard(),
            catalog,
            tracker: Mutex::new(StageTracker::new()),
            progress,
            state: AtomicU8::new(IDLE),
            stage_timeout: None,
        }
    }

    /// Bounds every backend call. An elapsed timeout is a stage failure.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    pub fn catalog(&self) -> SharedCatalog {
        self.catalog.clone()
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Current stage states, in stage order.
    pub fn snapshot(&self) -> Vec<StageRun> {
        self.progress.borrow().clone()
    }

    /// Receives a fresh snapshot after every stage transition.
    pub fn subscribe(&self) -> watch::Receiver<Vec<StageRun>> {
        self.progress.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) != IDLE
    }

    /// Requests cancellation of the in-flight run. Honoured at the next
    /// stage boundary. Returns `false` when nothing is running.
    pub fn cancel(&self) -> bool {
        match self
            .state
            .compare_exchange(RUNNING, CANCELLING, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                info!("Cancellation requested");
                true
            }
            Err(current) => current == CANCELLING,
        }
    }

    #[instrument(skip(self, config), fields(dataset = %config.dataset_id))]
    pub async fn run(&self, config: &AnalysisConfiguration) -> Result<AnalysisReport, FairlensError> {
        // 1. SINGLE RUN POLICY: reject, never interleave tracker writes
        if self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DomainError::ConcurrentRun.into());
        }
        let _guard = RunGuard(&self.state);

        // 2. VALIDATION (nothing is created when this fails)
        if let Err(e) = config.ensure_valid() {
            self.update_tracker(|t| {
                t.clear();
                Ok(())
            })?;
            return Err(e.into());
        }

        // 3. SNAPSHOT the rules: later catalog edits do not affect this run
        let enabled_rules = self
            .catalog
            .read()
            .map_err(|_| FairlensError::InternalError("Rule catalog lock poisoned".into()))?
            .enabled_snapshot();

        let stages = self.registry.ordered_stages(config);
        self.update_tracker(|t| {
            t.reset(&stages);
            Ok(())
        })?;

        info!(
            plan = %self.registry.plan(config),
            rules = enabled_rules.len(),
            "Starting bias analysis"
        );

        // 4. SEQUENTIAL EXECUTION
        let mut outputs = StageOutputs::default();
        let mut report = None;

        for stage in &stages {
            if self.state.load(Ordering::SeqCst) == CANCELLING {
                warn!(stage = %stage.id, "Run cancelled before stage start");
                return Err(self.abort(stage.id, CANCELLED_MESSAGE.to_string(), true)?);
            }

            self.update_tracker(|t| t.begin(stage.id))?;
            info!(stage = %stage.id, "Stage started");

            let result = self
                .execute_stage(stage.id, config, &enabled_rules, &mut outputs, &mut report)
                .await;

            match result {
                Ok(detail) => {
                    self.update_tracker(|t| t.complete(stage.id, detail))?;
                    info!(stage = %stage.id, "Stage completed");
                }
                Err(message) => {
                    warn!(stage = %stage.id, error = %message, "Stage failed, aborting run");
                    return Err(self.abort(stage.id, message, false)?);
                }
            }
        }

        // 5. FINALIZE
        report.ok_or_else(|| {
            FairlensError::InternalError("Report generation stage did not produce a report".into())
        })
    }

    async fn execute_stage(
        &self,
        stage_id: StageId,
        config: &AnalysisConfiguration,
        enabled_rules: &EnabledRules,
        outputs: &mut StageOutputs,
        report: &mut Option<AnalysisReport>,
    ) -> StageResult {
        let scope = config.scope();
        let backend = self.backend.as_ref();

        match stage_id {
            StageId::DataValidation => {
                let validation = self
                    .bounded(backend.validate_dataset(&config.dataset_id))
                    .await?;
                if !validation.valid {
                    return Err(format!(
                        "Dataset '{}' rejected: {}",
                        config.dataset_id,
                        validation
                            .reason
                            .unwrap_or_else(|| "no reason given".to_string())
                    ));
                }
                Ok(Detail::new()
                    .with("validated", true)
                    .with("dataset_id", config.dataset_id.clone()))
            }

            StageId::StatisticalAnalysis => self.bounded(backend.run_statistical_analysis(scope)).await,

            StageId::CustomRules => {
                if enabled_rules.is_empty() {
                    debug!("No enabled rules, skipping evaluation call");
                    return Ok(Detail::new().with("rules_evaluated", 0));
                }
                let results = self
                    .bounded(backend.evaluate_rules(scope, enabled_rules.as_slice()))
                    .await?;
                let passed = results.iter().filter(|r| r.passed).count();
                Ok(Detail::new()
                    .with("rules_evaluated", results.len())
                    .with("rules_passed", passed))
            }

            StageId::LlmAnalysis => {
                let insights = self
                    .bounded(backend.run_llm_analysis(scope, config.llm_prompt.as_deref()))
                    .await?;
                let detail = Detail::new()
                    .with("risk_assessment", insights.risk_assessment.clone())
                    .with("recommendations", insights.contextual_recommendations.len());
                outputs.llm_insights = Some(insights);
                Ok(detail)
            }

            StageId::Simulation => {
                let simulation = self.bounded(backend.run_simulation(scope)).await?;
                let detail = Detail::new()
                    .with("scenarios", simulation.scenarios.len())
                    .with("overall_impact", simulation.overall_impact);
                outputs.simulation_results = Some(simulation);
                Ok(detail)
            }

            StageId::ReportGeneration => {
                let consolidated = self
                    .bounded(backend.run_consolidated_analysis(config, enabled_rules.as_slice()))
                    .await?;
                let aggregated = ResultAggregator::aggregate(
                    &config.dataset_id,
                    consolidated,
                    enabled_rules,
                    &self.snapshot(),
                    std::mem::take(outputs),
                    Utc::now(),
                );
                let detail = Detail::new()
                    .with("overall_score", aggregated.overall_score)
                    .with("rules_reported", aggregated.per_rule_results.len())
                    .with("issues", aggregated.issues_found.len());
                *report = Some(aggregated);
                Ok(detail)
            }
        }
    }

    /// Awaits a backend call, applying the stage timeout if configured, and
    /// turns any backend error into a stage failure message.
    async fn bounded<T, F>(&self, call: F) -> Result<T, String>
    where
        F: std::future::Future<Output = Result<T, BackendError>>,
    {
        let result = match self.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(BackendError::Timeout(limit))),
            None => call.await,
        };
        result.map_err(|e| e.to_string())
    }

    /// Marks `stage_id` failed and builds the error returned by `run`.
    fn abort(
        &self,
        stage_id: StageId,
        message: String,
        cancelled: bool,
    ) -> Result<FairlensError, FairlensError> {
        self.update_tracker(|t| {
            if cancelled {
                t.begin(stage_id)?;
            }
            t.fail(stage_id, message.clone())
        })?;
        Ok(DomainError::StageFailure {
            stage_id,
            message,
            cancelled,
        }
        .into())
    }

    // Lock scope never spans an await.
    fn update_tracker<R>(
        &self,
        f: impl FnOnce(&mut StageTracker) -> Result<R, DomainError>,
    ) -> Result<R, FairlensError> {
        let mut tracker = self
            .tracker
            .lock()
            .map_err(|_| FairlensError::InternalError("Stage tracker lock poisoned".into()))?;
        let out = f(&mut tracker)?;
        self.progress.send_replace(tracker.snapshot());
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::bias::{
        AnalysisScope, ConsolidatedResult, DatasetValidation, LlmInsights, Rule, RulePatch,
        RuleResult, SimulationResults,
    };
    use crate::domain::stage::StageStatus;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    // --- SCRIPTED BACKEND ---
    #[derive(Default)]
    struct ScriptedBackend {
        calls: Mutex<Vec<&'static str>>,
        fail_on: Option<&'static str>,
        // Once set, `fail_on` no longer triggers.
        recovered: AtomicBool,
        dataset_invalid: bool,
        omit_rule: Option<&'static str>,
        hold_validation: Option<Arc<Notify>>,
        slow_statistics: Option<Duration>,
    }

    impl ScriptedBackend {
        fn record(&self, op: &'static str) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(op);
            if self.fail_on == Some(op) && !self.recovered.load(Ordering::SeqCst) {
                return Err(BackendError::Status {
                    code: 500,
                    body: format!("{} exploded", op),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn outcome(rule: &Rule) -> RuleResult {
        RuleResult {
            rule_id: rule.id.clone(),
            passed: true,
            score: 0.9,
            evaluated: true,
            detail: Detail::new(),
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedBackend {
        async fn validate_dataset(&self, _dataset_id: &str) -> Result<DatasetValidation, BackendError> {
            if let Some(gate) = &self.hold_validation {
                gate.notified().await;
            }
            self.record("validate_dataset")?;
            Ok(DatasetValidation {
                valid: !self.dataset_invalid,
                reason: self.dataset_invalid.then(|| "missing target column".to_string()),
            })
        }

        async fn run_statistical_analysis(&self, scope: AnalysisScope<'_>) -> Result<Detail, BackendError> {
            if let Some(delay) = self.slow_statistics {
                tokio::time::sleep(delay).await;
            }
            self.record("run_statistical_analysis")?;
            Ok(Detail::new().with("groups", scope.sensitive_columns.len()))
        }

        async fn evaluate_rules(
            &self,
            _scope: AnalysisScope<'_>,
            rules: &[Rule],
        ) -> Result<Vec<RuleResult>, BackendError> {
            self.record("evaluate_rules")?;
            Ok(rules.iter().map(outcome).collect())
        }

        async fn run_llm_analysis(
            &self,
            _scope: AnalysisScope<'_>,
            prompt: Option<&str>,
        ) -> Result<LlmInsights, BackendError> {
            self.record("run_llm_analysis")?;
            Ok(LlmInsights {
                summary: prompt.unwrap_or("default review").to_string(),
                contextual_recommendations: vec!["Collect more data for gender=X".into()],
                risk_assessment: "medium".into(),
            })
        }

        async fn run_simulation(&self, _scope: AnalysisScope<'_>) -> Result<SimulationResults, BackendError> {
            self.record("run_simulation")?;
            Ok(SimulationResults {
                scenarios: vec![],
                overall_impact: 0.12,
            })
        }

        async fn run_consolidated_analysis(
            &self,
            _config: &AnalysisConfiguration,
            rules: &[Rule],
        ) -> Result<ConsolidatedResult, BackendError> {
            self.record("run_consolidated_analysis")?;
            Ok(ConsolidatedResult {
                overall_score: 0.83,
                per_rule: rules
                    .iter()
                    .filter(|r| Some(r.id.as_str()) != self.omit_rule)
                    .map(outcome)
                    .collect(),
                issues_found: vec![],
                recommendations: vec!["Monitor approval rates monthly".into()],
            })
        }
    }

    // Catalog with exactly statistical_parity and demographic_parity enabled.
    fn catalog() -> SharedCatalog {
        let mut catalog = RuleCatalog::initialize();
        catalog
            .update("equal_opportunity", RulePatch::enabled(false))
            .unwrap();
        Arc::new(RwLock::new(catalog))
    }

    fn config() -> AnalysisConfiguration {
        AnalysisConfiguration::new("d1", "approved", ["gender"])
    }

    fn orchestrator(backend: Arc<ScriptedBackend>) -> PipelineOrchestrator {
        PipelineOrchestrator::new(backend, catalog())
    }

    fn status(snapshot: &[StageRun], id: StageId) -> Option<StageStatus> {
        snapshot.iter().find(|r| r.stage_id == id).map(|r| r.status)
    }

    fn stage_failure(err: &FairlensError) -> Option<(StageId, bool)> {
        match err.as_domain() {
            Some(DomainError::StageFailure {
                stage_id, cancelled, ..
            }) => Some((*stage_id, *cancelled)),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_success() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend::default());
        let orch = orchestrator(backend.clone());

        let report = orch.run(&config()).await?;

        assert_eq!(report.per_rule_results.len(), 2);
        assert!(report.llm_insights.is_none());
        assert!(report.simulation_results.is_none());
        assert_eq!(report.overall_score, 0.83);
        assert_eq!(report.dataset_id, "d1");

        let snap = orch.snapshot();
        assert_eq!(snap.len(), 4);
        assert!(
            snap.iter()
                .all(|r| r.status == StageStatus::Completed && r.progress == 100)
        );
        assert_eq!(
            backend.calls(),
            vec![
                "validate_dataset",
                "run_statistical_analysis",
                "evaluate_rules",
                "run_consolidated_analysis"
            ]
        );
        assert!(!orch.is_running());
        Ok(())
    }

    #[tokio::test]
    async fn test_rule_evaluation_failure_aborts_pipeline() {
        let backend = Arc::new(ScriptedBackend {
            fail_on: Some("evaluate_rules"),
            ..Default::default()
        });
        let orch = orchestrator(backend.clone());

        let err = orch.run(&config()).await.unwrap_err();
        assert_eq!(stage_failure(&err), Some((StageId::CustomRules, false)));
        assert!(err.to_string().contains("evaluate_rules exploded"));

        let snap = orch.snapshot();
        assert_eq!(status(&snap, StageId::DataValidation), Some(StageStatus::Completed));
        assert_eq!(status(&snap, StageId::StatisticalAnalysis), Some(StageStatus::Completed));
        assert_eq!(status(&snap, StageId::CustomRules), Some(StageStatus::Failed));
        assert_eq!(status(&snap, StageId::ReportGeneration), Some(StageStatus::Pending));
        assert!(!backend.calls().contains(&"run_consolidated_analysis"));
    }

    #[tokio::test]
    async fn test_statistical_failure_leaves_later_stages_pending() {
        let backend = Arc::new(ScriptedBackend {
            fail_on: Some("run_statistical_analysis"),
            ..Default::default()
        });
        let orch = orchestrator(backend);
        let cfg = config().with_llm(None).with_simulation();

        let err = orch.run(&cfg).await.unwrap_err();
        assert_eq!(stage_failure(&err), Some((StageId::StatisticalAnalysis, false)));

        let snap = orch.snapshot();
        for id in [
            StageId::CustomRules,
            StageId::LlmAnalysis,
            StageId::Simulation,
            StageId::ReportGeneration,
        ] {
            assert_eq!(status(&snap, id), Some(StageStatus::Pending), "{}", id);
        }
    }

    #[tokio::test]
    async fn test_rejected_dataset_is_stage_failure() {
        let backend = Arc::new(ScriptedBackend {
            dataset_invalid: true,
            ..Default::default()
        });
        let orch = orchestrator(backend);

        let err = orch.run(&config()).await.unwrap_err();
        assert_eq!(stage_failure(&err), Some((StageId::DataValidation, false)));
        let snap = orch.snapshot();
        assert_eq!(
            snap[0].error.as_deref(),
            Some("Dataset 'd1' rejected: missing target column")
        );
    }

    #[tokio::test]
    async fn test_invalid_config_creates_no_stage_runs() {
        let backend = Arc::new(ScriptedBackend::default());
        let orch = orchestrator(backend.clone());
        let cfg = AnalysisConfiguration::new("d1", "approved", Vec::<String>::new());

        let err = orch.run(&cfg).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));
        assert!(orch.snapshot().is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_optional_stages_follow_feature_flags() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend::default());
        let orch = orchestrator(backend.clone());

        let report = orch
            .run(&config().with_llm(Some("Focus on lending law".into())))
            .await?;

        let snap = orch.snapshot();
        assert_eq!(status(&snap, StageId::LlmAnalysis), Some(StageStatus::Completed));
        assert_eq!(status(&snap, StageId::Simulation), None);
        assert_eq!(
            report.llm_insights.map(|i| i.summary).as_deref(),
            Some("Focus on lending law")
        );
        assert!(report.simulation_results.is_none());
        assert!(!backend.calls().contains(&"run_simulation"));
        Ok(())
    }

    #[tokio::test]
    async fn test_llm_disabled_never_scheduled() -> anyhow::Result<()> {
        let orch = orchestrator(Arc::new(ScriptedBackend::default()));
        let report = orch.run(&config().with_simulation()).await?;

        assert_eq!(status(&orch.snapshot(), StageId::LlmAnalysis), None);
        assert!(report.llm_insights.is_none());
        assert!(report.simulation_results.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_backend_omitting_rule_still_reports_it() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend {
            omit_rule: Some("demographic_parity"),
            ..Default::default()
        });
        let report = orchestrator(backend).run(&config()).await?;

        assert_eq!(report.per_rule_results.len(), 2);
        let missing = &report.per_rule_results[1];
        assert_eq!(missing.rule_id, "demographic_parity");
        assert!(!missing.passed);
        assert!(!missing.was_evaluated());
        Ok(())
    }

    #[tokio::test]
    async fn test_consolidated_failure_fails_report_generation() {
        let backend = Arc::new(ScriptedBackend {
            fail_on: Some("run_consolidated_analysis"),
            ..Default::default()
        });
        let orch = orchestrator(backend);

        let err = orch.run(&config()).await.unwrap_err();
        assert_eq!(stage_failure(&err), Some((StageId::ReportGeneration, false)));
    }

    #[tokio::test]
    async fn test_stage_timeout_is_stage_failure() {
        let backend = Arc::new(ScriptedBackend {
            slow_statistics: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let orch = orchestrator(backend).with_stage_timeout(Duration::from_millis(20));

        let err = orch.run(&config()).await.unwrap_err();
        assert_eq!(stage_failure(&err), Some((StageId::StatisticalAnalysis, false)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_retry_restarts_from_scratch() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend {
            fail_on: Some("evaluate_rules"),
            ..Default::default()
        });
        let orch = orchestrator(backend.clone());

        assert!(orch.run(&config()).await.is_err());
        let failed = orch.snapshot();
        assert_eq!(failed.len(), 4);
        assert_eq!(status(&failed, StageId::CustomRules), Some(StageStatus::Failed));

        // Same orchestrator, healthy backend, different plan.
        backend.recovered.store(true, Ordering::SeqCst);
        orch.run(&config().with_llm(None)).await?;

        let retried = orch.snapshot();
        let ids: Vec<StageId> = retried.iter().map(|r| r.stage_id).collect();
        assert_eq!(
            ids,
            vec![
                StageId::DataValidation,
                StageId::StatisticalAnalysis,
                StageId::CustomRules,
                StageId::LlmAnalysis,
                StageId::ReportGeneration,
            ]
        );
        assert!(retried.iter().all(|r| {
            r.status == StageStatus::Completed && r.error.is_none() && r.progress == 100
        }));
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_identifiers_never_reach_backend() {
        let backend = Arc::new(ScriptedBackend::default());
        let orch = orchestrator(backend.clone());

        let err = orch
            .run(&AnalysisConfiguration::new("   ", "  ", ["gender"]))
            .await
            .unwrap_err();

        assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));
        assert!(backend.calls().is_empty());
        assert!(orch.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_idle_does_not_leak_into_next_run() -> anyhow::Result<()> {
        let orch = orchestrator(Arc::new(ScriptedBackend::default()));

        assert!(!orch.cancel());
        let report = orch.run(&config()).await?;

        assert_eq!(report.per_rule_results.len(), 2);
        assert!(orch.snapshot().iter().all(|r| r.error.is_none()));
        Ok(())
    }

    #[tokio::test]
    async fn test_catalog_edits_do_not_affect_in_flight_run() -> anyhow::Result<()> {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend {
            hold_validation: Some(gate.clone()),
            ..Default::default()
        });
        let orch = Arc::new(orchestrator(backend));
        let mut progress = orch.subscribe();

        let runner = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.run(&config()).await })
        };

        // Wait until data-validation is running, then edit the catalog.
        progress
            .wait_for(|s| status(s, StageId::DataValidation) == Some(StageStatus::Running))
            .await?;
        orch.catalog()
            .write()
            .unwrap()
            .add(Rule::custom("income_gap", "Income gap"))?;
        gate.notify_one();

        let report = runner.await??;
        assert_eq!(report.per_rule_results.len(), 2);
        assert!(
            report
                .per_rule_results
                .iter()
                .all(|r| r.rule_id != "income_gap")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_run_rejected_and_cancel() -> anyhow::Result<()> {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(ScriptedBackend {
            hold_validation: Some(gate.clone()),
            ..Default::default()
        });
        let orch = Arc::new(orchestrator(backend.clone()));
        let mut progress = orch.subscribe();

        let runner = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.run(&config()).await })
        };

        progress
            .wait_for(|s| status(s, StageId::DataValidation) == Some(StageStatus::Running))
            .await?;

        // A second run is refused and does not touch the tracker.
        let second = orch.run(&config()).await.unwrap_err();
        assert!(matches!(second.as_domain(), Some(DomainError::ConcurrentRun)));
        assert_eq!(
            status(&orch.snapshot(), StageId::DataValidation),
            Some(StageStatus::Running)
        );

        // Cancel: the current stage finishes, the next one is failed.
        assert!(orch.cancel());
        assert!(orch.cancel(), "a repeated cancel is still pending");
        gate.notify_one();

        let err = runner.await?.unwrap_err();
        assert_eq!(stage_failure(&err), Some((StageId::StatisticalAnalysis, true)));
        assert!(err.as_domain().is_some_and(|e| e.is_cancellation()));

        let snap = orch.snapshot();
        assert_eq!(status(&snap, StageId::DataValidation), Some(StageStatus::Completed));
        let cancelled = snap
            .iter()
            .find(|r| r.stage_id == StageId::StatisticalAnalysis)
            .unwrap();
        assert_eq!(cancelled.status, StageStatus::Failed);
        assert_eq!(cancelled.error.as_deref(), Some(CANCELLED_MESSAGE));
        assert_eq!(status(&snap, StageId::CustomRules), Some(StageStatus::Pending));
        assert_eq!(backend.calls(), vec!["validate_dataset"]);

        assert!(!orch.is_running());
        assert!(!orch.cancel());
        Ok(())
    }
}
