// fairlens/src/main.rs

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=fairlens_core=debug fairlens run ... to see backend calls
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project_dir,
            dataset,
            target,
            sensitive,
            llm,
            prompt,
            simulation,
            fixture,
        } => {
            let overrides = commands::run::RunOverrides {
                dataset,
                target,
                sensitive,
                llm,
                prompt,
                simulation,
                fixture,
            };
            commands::run::execute(project_dir, overrides).await?;
        }
        Commands::Rules {
            project_dir,
            min_severity,
        } => commands::rules::execute(project_dir, min_severity)?,
        Commands::Stages { llm, simulation } => commands::stages::execute(llm, simulation),
    }

    Ok(())
}
