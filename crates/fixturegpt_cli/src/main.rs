//! FixtureGPT CLI
//!
//! Inspect and manage recorded fixtures.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod render;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use console::{Term, style};
use fixturegpt_core::SnapshotConfig;
use fixturegpt_storage::{FixtureStats, FixtureStore, FsFixtureStore, fixtures_named};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fixturegpt")]
#[command(about = "FixtureGPT - Record and replay expensive outputs", long_about = None)]
struct Cli {
    /// Fixture directory (defaults to FIXTUREGPT_DIR or ./fixtures)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about saved fixtures
    Stats {
        /// Cost weight of one recorded call, in USD
        #[arg(long)]
        cost_per_call: Option<f64>,
    },
    /// Show the effective configuration
    Config,
    /// Show every fixture recorded under a name
    Show {
        /// Call name
        name: String,
    },
    /// Delete all local fixtures
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stdout();
    term.write_str(&format!("{prompt} [y/N] "))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fixturegpt=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SnapshotConfig::from_env()?;
    if let Some(dir) = cli.dir {
        config = config.with_fixtures_dir(dir);
    }
    tracing::debug!(
        dir = %config.fixtures_dir.display(),
        mode = %config.mode,
        sync_mode = %config.sync.sync_mode,
        "resolved configuration"
    );
    let store = FsFixtureStore::new(&config.fixtures_dir);

    match cli.command {
        Commands::Stats { cost_per_call } => {
            if let Some(cost) = cost_per_call {
                config = config.with_cost_per_call(cost);
            }
            let stats = FixtureStats::collect(&store, config.cost_per_call)?;
            print!("{}", render::stats(&stats, &config));
            Ok(())
        }
        Commands::Config => {
            print!("{}", render::config(&config));
            Ok(())
        }
        Commands::Show { name } => {
            let found = fixtures_named(&store, &name)?;
            print!("{}", render::fixtures(&name, &found));
            Ok(())
        }
        Commands::Clear { yes } => {
            let count = store.count()?;
            if count == 0 {
                println!("{}", style("No fixtures to clear").yellow());
                return Ok(());
            }
            let prompt = format!(
                "Delete {count} fixture(s) from {}?",
                config.fixtures_dir.display()
            );
            if yes || confirm(&prompt)? {
                store.clear()?;
                println!("{}", style(format!("Cleared {count} fixture(s)")).green());
            } else {
                println!("{}", style("Operation cancelled").yellow());
            }
            Ok(())
        }
    }
}
