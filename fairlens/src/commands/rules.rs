// fairlens/src/commands/rules.rs
//
// USE CASE: List the session rule catalog (built-ins + rules.yml).

use std::path::PathBuf;

use anyhow::Context;
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL_CONDENSED};
use fairlens_core::domain::bias::{Rule, RuleSeverity};
use fairlens_core::infrastructure::config::load_project_config;

pub fn execute(project_dir: PathBuf, min_severity: Option<RuleSeverity>) -> anyhow::Result<()> {
    let config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    let catalog = config.rules.build_catalog()?;

    let floor = min_severity.unwrap_or(RuleSeverity::Low);
    let shown: Vec<&Rule> = catalog
        .rules()
        .iter()
        .filter(|r| r.severity >= floor)
        .collect();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Id", "Name", "Category", "Severity", "Enabled", "Parameters"]);

    for rule in &shown {
        let enabled = if rule.enabled {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        let params = rule
            .parameters
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");

        table.add_row(vec![
            Cell::new(&rule.id),
            Cell::new(&rule.name),
            Cell::new(rule.category),
            Cell::new(rule.severity),
            enabled,
            Cell::new(params),
        ]);
    }

    println!("{table}");
    println!(
        "📋 {} rule(s) shown, {} enabled in catalog",
        shown.len(),
        catalog.enabled_snapshot().len()
    );
    Ok(())
}
