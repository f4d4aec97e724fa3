// fairlens/src/commands/run.rs
//
// USE CASE: Run the staged bias analysis and write the report.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL_CONDENSED};
use fairlens_core::application::PipelineOrchestrator;
use fairlens_core::domain::bias::{AnalysisConfiguration, AnalysisReport};
use fairlens_core::domain::stage::{StageId, StageRun, StageStatus};
use fairlens_core::infrastructure::adapters::{FixtureBackend, HttpAnalysisBackend};
use fairlens_core::infrastructure::config::{AnalysisDefaults, load_project_config};
use fairlens_core::infrastructure::fs::save_report;
use fairlens_core::ports::backend::AnalysisBackend;
use tracing::debug;

/// Command-line values layered over the `analysis` section of the project file.
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub dataset: Option<String>,
    pub target: Option<String>,
    pub sensitive: Vec<String>,
    pub llm: bool,
    pub prompt: Option<String>,
    pub simulation: bool,
    pub fixture: Option<PathBuf>,
}

impl RunOverrides {
    fn configuration(&self, defaults: &AnalysisDefaults) -> AnalysisConfiguration {
        let mut cfg = defaults.to_configuration();
        if let Some(dataset) = &self.dataset {
            cfg.dataset_id = dataset.clone();
        }
        if let Some(target) = &self.target {
            cfg.target_column = target.clone();
        }
        if !self.sensitive.is_empty() {
            cfg.sensitive_columns = self.sensitive.clone();
        }
        // Flags only switch stages on; the project file cannot be negated here.
        cfg.llm_enabled |= self.llm;
        cfg.simulation_enabled |= self.simulation;
        if self.prompt.is_some() {
            cfg.llm_prompt = self.prompt.clone();
        }
        cfg
    }
}

pub async fn execute(project_dir: PathBuf, overrides: RunOverrides) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Load the Config (Infra)
    println!("⚙️  Loading configuration...");
    let config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    println!("   Project: {} (v{})", config.name, config.version);

    let analysis = overrides.configuration(&config.analysis);
    debug!(config = ?analysis, "Resolved analysis configuration");
    let catalog = config
        .rules
        .build_catalog()
        .context("Invalid rules.yml")?;

    // B. Pick the backend adapter
    let fixture = overrides
        .fixture
        .clone()
        .or_else(|| config.backend.fixture.as_ref().map(|f| project_dir.join(f)));

    let backend: Arc<dyn AnalysisBackend> = match fixture {
        Some(path) => {
            println!("   Backend: fixture {}", path.display());
            Arc::new(FixtureBackend::from_path(&path)?)
        }
        None => {
            println!("   Backend: {}", config.backend.url);
            Arc::new(
                HttpAnalysisBackend::new(&config.backend.url, config.backend.timeout())
                    .context("Failed to build HTTP client")?,
            )
        }
    };

    // C. Run the Pipeline (Application Layer)
    let orchestrator = PipelineOrchestrator::new(backend, Arc::new(RwLock::new(catalog)))
        .with_stage_timeout(config.backend.timeout());
    println!("🧭 Plan: {}", orchestrator.registry().plan(&analysis));

    let mut progress = orchestrator.subscribe();
    let mut seen = BTreeMap::new();
    let mut cancelling = false;

    let run = orchestrator.run(&analysis);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            res = &mut run => break res,
            Ok(()) = progress.changed() => {
                let runs = progress.borrow_and_update().clone();
                print_transitions(&runs, &mut seen);
            }
            _ = tokio::signal::ctrl_c(), if !cancelling => {
                cancelling = orchestrator.cancel();
                eprintln!("\n🛑 Cancelling after the current stage...");
            }
        }
    };

    let stages = orchestrator.snapshot();
    print_transitions(&stages, &mut seen);
    if !stages.is_empty() {
        println!("\n{}", stage_table(&stages));
    }

    match result {
        Ok(report) => {
            print_report(&report);
            let target_dir = project_dir.join(&config.target_path);
            let path = save_report(&target_dir, &report)?;
            println!("📄 Report saved to {}", path.display());
            println!("\n✨ SUCCESS! Analysis finished in {:.2?}", start.elapsed());
        }
        Err(e) => {
            match e.as_domain() {
                Some(d) if d.is_cancellation() => {
                    eprintln!("\n🛑 CANCELLED. No report was written.");
                }
                Some(d) => {
                    if let Some(stage) = d.failed_stage() {
                        eprintln!("\n❌ FAILURE at stage '{}'.", stage);
                    }
                    eprintln!("{:?}", miette::Report::new(d.clone()));
                }
                None => eprintln!("\n💥 ANALYSIS ERROR: {}", e),
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_transitions(runs: &[StageRun], seen: &mut BTreeMap<StageId, StageStatus>) {
    for run in runs {
        if run.status == StageStatus::Pending || seen.get(&run.stage_id) == Some(&run.status) {
            continue;
        }
        seen.insert(run.stage_id, run.status);
        let icon = match run.status {
            StageStatus::Running => "⏳",
            StageStatus::Completed => "✅",
            StageStatus::Failed => "❌",
            StageStatus::Pending => "  ",
        };
        match run.elapsed().filter(|_| run.status.is_terminal()) {
            Some(d) => println!(
                "   {} {} ({}, {}ms)",
                icon,
                run.name,
                run.status,
                d.num_milliseconds()
            ),
            None => println!("   {} {} ({})", icon, run.name, run.status),
        }
    }
}

fn stage_table(runs: &[StageRun]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Stage", "Status", "Progress", "Elapsed", "Error"]);

    for run in runs {
        let color = match run.status {
            StageStatus::Completed => Color::Green,
            StageStatus::Failed => Color::Red,
            StageStatus::Running => Color::Yellow,
            StageStatus::Pending => Color::DarkGrey,
        };
        let elapsed = run
            .elapsed()
            .map(|d| format!("{}ms", d.num_milliseconds()))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(run.stage_id),
            Cell::new(run.status).fg(color),
            Cell::new(format!("{}%", run.progress)),
            Cell::new(elapsed),
            Cell::new(run.error.as_deref().unwrap_or("")),
        ]);
    }
    table
}

fn print_report(report: &AnalysisReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Rule", "Result", "Score"]);

    for result in &report.per_rule_results {
        let verdict = if !result.was_evaluated() {
            Cell::new("not evaluated").fg(Color::DarkGrey)
        } else if result.passed {
            Cell::new("pass").fg(Color::Green)
        } else {
            Cell::new("fail").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&result.rule_id),
            verdict,
            Cell::new(format!("{:.3}", result.score)),
        ]);
    }

    println!("{table}");
    println!(
        "📊 Overall score: {:.3} ({}/{} rules passed)",
        report.overall_score,
        report.passed_rules(),
        report.per_rule_results.len()
    );
    for issue in &report.issues_found {
        println!("   ⚠️  [{}] {}", issue.severity, issue.description);
    }
    if let Some(insights) = &report.llm_insights {
        println!("🤖 LLM risk assessment: {}", insights.risk_assessment);
    }
    if let Some(sim) = &report.simulation_results {
        println!(
            "🧪 Simulation: {} scenario(s), overall impact {:.3}",
            sim.scenarios.len(),
            sim.overall_impact
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_layer_over_project_defaults() {
        let defaults = AnalysisDefaults {
            dataset_id: Some("loans_2023".into()),
            target_column: Some("approved".into()),
            sensitive_columns: vec!["gender".into()],
            llm_enabled: true,
            ..AnalysisDefaults::default()
        };
        let overrides = RunOverrides {
            dataset: Some("loans_2024".into()),
            sensitive: vec!["age_band".into(), "region".into()],
            simulation: true,
            ..RunOverrides::default()
        };

        let cfg = overrides.configuration(&defaults);

        assert_eq!(cfg.dataset_id, "loans_2024");
        assert_eq!(cfg.target_column, "approved");
        assert_eq!(cfg.sensitive_columns, vec!["age_band", "region"]);
        assert!(cfg.llm_enabled);
        assert!(cfg.simulation_enabled);
    }

    #[test]
    fn test_print_transitions_reports_each_status_once() {
        let run = StageRun {
            stage_id: StageId::DataValidation,
            name: "Data Validation".into(),
            status: StageStatus::Running,
            progress: 0,
            detail: None,
            error: None,
            started_at: None,
            finished_at: None,
        };
        let mut seen = BTreeMap::new();
        print_transitions(std::slice::from_ref(&run), &mut seen);
        print_transitions(std::slice::from_ref(&run), &mut seen);
        assert_eq!(seen.get(&StageId::DataValidation), Some(&StageStatus::Running));
        assert_eq!(seen.len(), 1);
    }
}
