use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod geocode;
mod model;
mod normalize;
mod utils;

#[derive(Debug, Parser)]
#[command(version, about = "Geocode and normalize the ICN capability dataset")]
struct Cli {
    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add coordinates to the address rows of a CSV file
    Geocode(geocode::GeocodeArgs),
    /// Split an enriched CSV into normalized tables
    Normalize(normalize::NormalizeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Geocode(args) => geocode::main(args),
        Command::Normalize(args) => normalize::main(args),
    }
}
