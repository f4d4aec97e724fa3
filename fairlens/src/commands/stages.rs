// fairlens/src/commands/stages.rs
//
// USE CASE: Show which stages a run would execute.

use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use fairlens_core::domain::bias::AnalysisConfiguration;
use fairlens_core::domain::stage::StageRegistry;

pub fn execute(llm: bool, simulation: bool) {
    let config = AnalysisConfiguration {
        llm_enabled: llm,
        simulation_enabled: simulation,
        ..AnalysisConfiguration::default()
    };
    let registry = StageRegistry::standard();
    let planned = registry.ordered_stages(&config);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["#", "Stage", "Name", "Est.", "Planned"]);

    for (i, stage) in registry.all().iter().enumerate() {
        let included = planned.iter().any(|s| s.id == stage.id);
        table.add_row(vec![
            (i + 1).to_string(),
            stage.id.to_string(),
            stage.name.to_string(),
            format!("{}s", stage.estimated_duration.as_secs()),
            if included { "yes" } else { "skipped" }.to_string(),
        ]);
    }

    println!("{table}");
    println!("🧭 Plan: {}", registry.plan(&config));
}
