use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ecosim::{
    commands::TurnOutcome,
    engine::{EngineBuilder, EngineSettings},
    events::LoggingObserver,
    scenario::{Scenario, ScenarioLoader},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Grid ecosystem simulator")]
struct Cli {
    /// Path to a scenario YAML file (the stock 20x20 game when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Run this many ticks without command turns, then stop
    #[arg(long)]
    ticks: Option<u64>,

    /// Override snapshot interval in ticks (0 disables autosave)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for autosaved snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Log debug output from the simulator
    #[arg(long, short)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "ecosim=debug" } else { "ecosim=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::default(),
    };
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        rules: scenario.rules,
        snapshot_interval_ticks: cli
            .snapshot_interval
            .unwrap_or(scenario.snapshot_interval_ticks),
        snapshot_dir: cli
            .snapshot_dir
            .unwrap_or_else(|| PathBuf::from("snapshots")),
    };
    let mut engine = EngineBuilder::new(settings).standard().build();
    engine.subscribe(LoggingObserver);
    let mut state = scenario.build_state(&mut engine.rng_stream("setup"))?;

    if let Some(ticks) = scenario.ticks(cli.ticks) {
        engine.run_with_hook(&mut state, ticks, |report| println!("{}", report.recap))?;
        println!(
            "Scenario '{}' completed for {} ticks. Final population: {}",
            scenario.name,
            ticks,
            state.population()
        );
        return Ok(());
    }

    println!("Type 'help' for the list of commands.");
    let stdin = io::stdin();
    loop {
        let report = engine.tick(&mut state)?;
        println!("{}", report.recap);
        let outcome = engine
            .command_session(&mut state)
            .run_turn(stdin.lock(), io::stdout().lock())?;
        if outcome == TurnOutcome::Exit {
            break;
        }
    }
    println!("Shutting down the game. Goodbye!");
    Ok(())
}
