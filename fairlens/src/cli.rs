// fairlens/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use fairlens_core::domain::bias::RuleSeverity;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fairlens")]
#[command(about = "Staged bias analysis for tabular datasets", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs the bias analysis (validation -> statistics -> rules -> report)
    Run {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Dataset identifier (overrides `analysis.dataset_id`)
        #[arg(long, short)]
        dataset: Option<String>,

        /// Outcome column (overrides `analysis.target_column`)
        #[arg(long, short)]
        target: Option<String>,

        /// Protected attributes, comma separated (ex: "gender,age_band")
        #[arg(long, short, value_delimiter = ',')]
        sensitive: Vec<String>,

        /// Enable the LLM analysis stage
        #[arg(long)]
        llm: bool,

        /// Free-text instruction forwarded to the LLM stage
        #[arg(long, requires = "llm")]
        prompt: Option<String>,

        /// Enable the scenario simulation stage
        #[arg(long)]
        simulation: bool,

        /// Answer from a canned YAML file instead of the HTTP backend
        #[arg(long, env = "FAIRLENS_FIXTURE")]
        fixture: Option<PathBuf>,
    },

    /// 📋 Lists the rule catalog after project overrides
    Rules {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Only show rules at or above this severity
        #[arg(long)]
        min_severity: Option<RuleSeverity>,
    },

    /// 🧭 Prints the stage plan for the given toggles
    Stages {
        #[arg(long)]
        llm: bool,

        #[arg(long)]
        simulation: bool,
    },
}
