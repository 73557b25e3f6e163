#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use relay::{Relay, find_config_file};
use relay_common::logging;

/// Durable store-and-forward email relay
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "Deliver queued email from the relay store", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file (overrides `RELAY_CONFIG`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the delivery worker
    Run {
        /// Stop after this many iterations instead of running forever
        #[arg(long)]
        iterations: Option<u64>,
    },
    /// Apply the store migrations and exit
    Migrate,
}

fn load_config(explicit: Option<PathBuf>) -> anyhow::Result<Relay> {
    let from_env = std::env::var_os("RELAY_CONFIG").map(PathBuf::from);

    let relay = match find_config_file(explicit, from_env)? {
        Some(path) => {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
            })?;
            Relay::from_ron(&content)?
        }
        None => Relay::default(),
    };

    Ok(match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => relay.with_database_url(url),
        _ => relay,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let relay = load_config(cli.config)?;

    logging::init();

    match cli.command {
        Commands::Run { iterations } => {
            println!("relay {} starting delivery worker", env!("CARGO_PKG_VERSION"));
            relay.run(iterations).await?;
        }
        Commands::Migrate => relay.migrate().await?,
    }

    Ok(())
}
