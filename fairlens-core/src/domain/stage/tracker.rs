// fairlens-core/src/domain/stage/tracker.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::registry::{Stage, StageId};
use crate::domain::detail::Detail;
use crate::domain::error::DomainError;

/// Forward-only: pending -> running -> (completed | failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runtime state of one stage within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRun {
    pub stage_id: StageId,
    pub name: String,
    pub status: StageStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Detail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl StageRun {
    fn pending(stage: &Stage) -> Self {
        Self {
            stage_id: stage.id,
            name: stage.name.to_string(),
            status: StageStatus::Pending,
            progress: 0,
            detail: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Per-run stage state. Entries are kept in pipeline order.
#[derive(Debug, Clone, Default)]
pub struct StageTracker {
    runs: Vec<StageRun>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops any previous run state and starts over with `stages`, all pending.
    pub fn reset(&mut self, stages: &[Stage]) {
        self.runs = stages.iter().map(StageRun::pending).collect();
    }

    /// Forgets everything, e.g. when a run is rejected before it starts.
    pub fn clear(&mut self) {
        self.runs.clear();
    }

    pub fn begin(&mut self, stage_id: StageId) -> Result<(), DomainError> {
        let run = self.expect_status(stage_id, StageStatus::Pending, StageStatus::Running)?;
        run.status = StageStatus::Running;
        run.progress = 0;
        run.started_at = Some(Utc::now());
        Ok(())
    }

    /// Records sub-progress. Values are capped at 100 and never go
    /// backwards: a lower value keeps the previous maximum.
    pub fn advance(&mut self, stage_id: StageId, progress: u8) -> Result<u8, DomainError> {
        let run = self.expect_status(stage_id, StageStatus::Running, StageStatus::Running)?;
        run.progress = run.progress.max(progress.min(100));
        Ok(run.progress)
    }

    pub fn complete(&mut self, stage_id: StageId, detail: Detail) -> Result<(), DomainError> {
        let run = self.expect_status(stage_id, StageStatus::Running, StageStatus::Completed)?;
        run.status = StageStatus::Completed;
        run.progress = 100;
        run.detail = Some(detail);
        run.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Marks a running stage as failed. Progress keeps its last value.
    pub fn fail(&mut self, stage_id: StageId, error: impl Into<String>) -> Result<(), DomainError> {
        let run = self.expect_status(stage_id, StageStatus::Running, StageStatus::Failed)?;
        run.status = StageStatus::Failed;
        run.error = Some(error.into());
        run.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<StageRun> {
        self.runs.clone()
    }

    pub fn get(&self, stage_id: StageId) -> Option<&StageRun> {
        self.runs.iter().find(|r| r.stage_id == stage_id)
    }

    pub fn status_of(&self, stage_id: StageId) -> Option<StageStatus> {
        self.get(stage_id).map(|r| r.status)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn expect_status(
        &mut self,
        stage_id: StageId,
        expected: StageStatus,
        to: StageStatus,
    ) -> Result<&mut StageRun, DomainError> {
        let run = self
            .runs
            .iter_mut()
            .find(|r| r.stage_id == stage_id)
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "Stage '{}' is not part of the current run",
                    stage_id
                ))
            })?;

        if run.status != expected {
            return Err(DomainError::InvalidTransition {
                stage_id,
                from: run.status,
                to,
            });
        }
        Ok(run)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::bias::AnalysisConfiguration;
    use crate::domain::stage::StageRegistry;
    use anyhow::Result;
    use proptest::prelude::*;

    fn tracker() -> StageTracker {
        let cfg = AnalysisConfiguration::new("d1", "approved", ["gender"]);
        let mut t = StageTracker::new();
        t.reset(&StageRegistry::standard().ordered_stages(&cfg));
        t
    }

    #[test]
    fn test_reset_creates_pending_entries() {
        let t = tracker();
        let snap = t.snapshot();
        assert_eq!(snap.len(), 4);
        assert!(
            snap.iter()
                .all(|r| r.status == StageStatus::Pending && r.progress == 0)
        );
        assert_eq!(snap[0].stage_id, StageId::DataValidation);
        assert_eq!(snap[3].stage_id, StageId::ReportGeneration);
    }

    #[test]
    fn test_happy_path_transitions() -> Result<()> {
        let mut t = tracker();
        t.begin(StageId::DataValidation)?;
        assert_eq!(t.advance(StageId::DataValidation, 40)?, 40);
        t.complete(
            StageId::DataValidation,
            Detail::new().with("validated", true),
        )?;

        let run = t.get(StageId::DataValidation).unwrap();
        assert_eq!(run.status, StageStatus::Completed);
        assert_eq!(run.progress, 100);
        assert_eq!(
            run.detail.as_ref().and_then(|d| d.get("validated")),
            Some(&serde_json::Value::Bool(true))
        );
        assert!(run.elapsed().is_some());
        Ok(())
    }

    #[test]
    fn test_fail_keeps_last_progress() -> Result<()> {
        let mut t = tracker();
        t.begin(StageId::DataValidation)?;
        t.advance(StageId::DataValidation, 65)?;
        t.fail(StageId::DataValidation, "dataset not found")?;

        let run = t.get(StageId::DataValidation).unwrap();
        assert_eq!(run.status, StageStatus::Failed);
        assert_eq!(run.progress, 65);
        assert_eq!(run.error.as_deref(), Some("dataset not found"));
        Ok(())
    }

    #[test]
    fn test_invalid_transitions() -> Result<()> {
        let mut t = tracker();

        // pending -> completed is not allowed
        assert!(matches!(
            t.complete(StageId::CustomRules, Detail::new()),
            Err(DomainError::InvalidTransition { .. })
        ));

        t.begin(StageId::CustomRules)?;
        assert!(matches!(
            t.begin(StageId::CustomRules),
            Err(DomainError::InvalidTransition {
                from: StageStatus::Running,
                ..
            })
        ));

        t.complete(StageId::CustomRules, Detail::new())?;
        // nothing leaves a terminal state
        assert!(t.fail(StageId::CustomRules, "late").is_err());
        assert!(t.advance(StageId::CustomRules, 10).is_err());
        assert_eq!(
            t.status_of(StageId::CustomRules),
            Some(StageStatus::Completed)
        );
        Ok(())
    }

    #[test]
    fn test_stage_outside_run() {
        let mut t = tracker();
        assert!(matches!(
            t.begin(StageId::LlmAnalysis),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_progress_is_capped() -> Result<()> {
        let mut t = tracker();
        t.begin(StageId::StatisticalAnalysis)?;
        assert_eq!(t.advance(StageId::StatisticalAnalysis, 250)?, 100);
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_progress_never_decreases(updates in proptest::collection::vec(any::<u8>(), 1..40)) {
            let mut t = tracker();
            t.begin(StageId::StatisticalAnalysis).unwrap();

            let mut last = 0u8;
            for value in updates {
                let recorded = t.advance(StageId::StatisticalAnalysis, value).unwrap();
                prop_assert!(recorded >= last);
                prop_assert!(recorded <= 100);
                last = recorded;
            }
        }
    }
}
