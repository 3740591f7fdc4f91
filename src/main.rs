use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use scroll_keeper::config::ScrollConfig;
use scroll_keeper::scenario::Scenario;
use scroll_keeper::services::tracing_setup;
use std::path::PathBuf;

/// Replay a scripted navigation session through the scroll engine
#[derive(Parser, Debug)]
#[command(name = "scroll-keeper")]
#[command(about = "Replays navigation scenarios and reports scroll restoration", long_about = None)]
#[command(version)]
struct Args {
    /// Scenario file (JSON)
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Configuration file overriding the scenario's own config
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    match &args.log_file {
        Some(path) => tracing_setup::init_global(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => tracing_setup::init_stderr(),
    }

    let mut scenario = Scenario::load_from_file(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;

    if let Some(config_path) = &args.config {
        scenario.config = ScrollConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    }

    if args.dump_config {
        let json = serde_json::to_string_pretty(&scenario.config)
            .context("Failed to serialize config")?;
        println!("{json}");
        return Ok(());
    }

    let report = scenario.replay().context("Replay failed")?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{json}");

    Ok(())
}
