//! stripestore CLI
//!
//! Inspect and edit the entries of a striped unit.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stripestore::{Config, Registry, StoreError, UnitConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// stripestore CLI
#[derive(Parser, Debug)]
#[command(name = "stripestore-cli")]
#[command(about = "Inspect and edit entries of a striped storage unit")]
#[command(version)]
struct Args {
    /// Backing volume, in volume-index order (repeat for striped units)
    #[arg(short, long = "volume", required = true)]
    volumes: Vec<PathBuf>,

    /// Stripe size in bytes
    #[arg(short, long, default_value = "65536")]
    stripe_size: u64,

    /// Reserved TOC region size in bytes
    #[arg(short, long, default_value = "65536")]
    toc_region_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the table of contents
    Toc,

    /// Write an entry's contents to stdout or a file
    Get {
        /// The entry key
        key: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Store a file as an entry
    Put {
        /// The entry key
        key: String,

        /// File whose contents become the entry
        input: PathBuf,
    },

    /// Remove an entry (its space is not reclaimed)
    Del {
        /// The entry key
        key: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stripestore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::default();

    let mut registry = match Registry::new(config.clone()) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("Failed to initialize registry: {}", e);
            std::process::exit(config.fatal_exit_code);
        }
    };

    if let Err(e) = run(&mut registry, args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(registry: &mut Registry, args: Args) -> Result<(), StoreError> {
    const UNIT: u32 = 0;

    let unit_config = UnitConfig::builder()
        .volumes(args.volumes)
        .stripe_size(args.stripe_size)
        .toc_region_size(args.toc_region_size)
        .build();

    let unit = registry.open_unit(UNIT, &unit_config)?;

    match args.command {
        Commands::Toc => {
            print!("{}", unit.toc());
        }
        Commands::Get { key, output } => {
            let data = unit.read_entry_to_vec(&key)?;
            match output {
                Some(path) => fs::write(path, &data)?,
                None => io::stdout().write_all(&data)?,
            }
        }
        Commands::Put { key, input } => {
            let data = fs::read(input)?;
            let address = unit.write_entry(&key, &data)?;
            tracing::info!("Stored {} ({} bytes) at {}", key, data.len(), address);
        }
        Commands::Del { key } => {
            unit.remove_entry(&key)?;
            tracing::info!("Removed {}", key);
        }
    }

    registry.close_unit(UNIT)
}
