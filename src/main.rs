use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use simulacrum::config::{load_config, SimConfig};
use simulacrum::interactive::Interactive;
use simulacrum::world::Roster;
use simulacrum::Simulation;

/// Terminal simulation of LLM-driven personas
#[derive(Parser, Debug)]
#[command(name = "simulacrum", version, about)]
struct Cli {
    /// Config file (TOML, or JSON by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider deciding the actions (ollama, openai, gemini)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model name; the provider default otherwise
    #[arg(long, global = true)]
    model: Option<String>,

    /// Seed for agent selection
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Info logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive REPL (default)
    Repl,
    /// Headless run printing the journal to stdout
    Run {
        /// Stop after this many turns; Ctrl+C otherwise
        #[arg(long)]
        turns: Option<u64>,

        /// Speed 1-10
        #[arg(long)]
        speed: Option<u8>,

        /// Rewrite a JSON snapshot after every journal entry
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
    /// Print the built-in roster as TOML
    Roster,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::debug!("Starting simulacrum {}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(provider) = cli.provider {
        config.provider = provider.to_lowercase();
    }
    if cli.model.is_some() {
        config.model = cli.model;
    }

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            let registry = config.registry();
            let sim = seeded(config.simulation(&registry)?, cli.seed);
            Interactive::new(sim, registry, config).run().await?;
        }
        Commands::Run {
            turns,
            speed,
            snapshot,
        } => {
            if let Some(speed) = speed {
                config.speed = speed;
            }
            let registry = config.registry();
            let sim = seeded(config.simulation(&registry)?, cli.seed);
            run_headless(&sim, turns, snapshot.as_deref()).await?;
        }
        Commands::Config => {
            let path = cli
                .config
                .or_else(SimConfig::config_path)
                .map_or_else(|| "-".to_string(), |p| p.display().to_string());
            println!("# {path}");
            print!("{}", config.to_toml()?);
        }
        Commands::Roster => {
            print!("{}", Roster::builtin().to_toml()?);
        }
    }

    Ok(())
}

fn seeded(sim: Simulation, seed: Option<u64>) -> Simulation {
    match seed {
        Some(seed) => sim.with_seed(seed),
        None => sim,
    }
}

async fn run_headless(
    sim: &Simulation,
    turns: Option<u64>,
    snapshot: Option<&Path>,
) -> anyhow::Result<()> {
    let mut events = sim.subscribe();
    sim.play();

    tracing::info!(
        "Running {} with {} at {}x",
        turns.map_or_else(|| "until Ctrl+C".to_string(), |n| format!("{n} turns")),
        sim.decider().provider_name(),
        sim.speed()
    );

    let run = sim.run(turns, async {
        let _ = tokio::signal::ctrl_c().await;
    });
    tokio::pin!(run);

    let completed = loop {
        tokio::select! {
            completed = &mut run => break completed,
            event = events.recv() => match event {
                Ok(entry) => {
                    println!("{}", entry.prompt_line());
                    if let Some(path) = snapshot {
                        sim.write_snapshot(path).await?;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("{skipped} journal entries skipped");
                }
                Err(RecvError::Closed) => {}
            },
        }
    };

    // Entries published by the last turn
    while let Ok(entry) = events.try_recv() {
        println!("{}", entry.prompt_line());
    }
    if let Some(path) = snapshot {
        sim.write_snapshot(path)
            .await
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    }

    eprintln!("{completed} turns completed");
    Ok(())
}
