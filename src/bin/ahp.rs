#![forbid(unsafe_code)]

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ahp_harness::matrix::ComparisonMatrix;
use ahp_harness::priority::{self, RANDOM_INDEX};
use ahp_harness::session::{self, SessionSnapshot};

#[derive(Parser)]
#[command(name = "ahp", version, about = "Analytic Hierarchy Process CLI")]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank alternatives from a session snapshot JSON
    Rank {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Aggregate agents' judgments into consensus matrices without ranking
    Consensus {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Priority weights and consistency of one matrix (JSON array of rows)
    Weights {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Relative tolerance for the reciprocity check; rounded inputs like 0.333 need ~1e-3
        #[arg(long, default_value_t = 1e-3)]
        reciprocity_tolerance: f64,
    },
    /// Print the random consistency index table
    RandomIndex,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Rank { input, out } => {
            let snapshot: SessionSnapshot = read_json(&input)?;
            let report = session::evaluate(&snapshot)?;
            info!(
                agents = report.agent_count,
                inconsistent = report.inconsistent.len(),
                "ranking computed"
            );
            write_json(&out, &report)?;
        }
        Commands::Consensus { input, out } => {
            let snapshot: SessionSnapshot = read_json(&input)?;
            let consensus = session::aggregate_snapshot(&snapshot)?;
            write_json(&out, &consensus)?;
        }
        Commands::Weights {
            input,
            out,
            reciprocity_tolerance,
        } => {
            let rows: Vec<Vec<f64>> = read_json(&input)?;
            let matrix = ComparisonMatrix::from_rows_with_tolerance(&rows, reciprocity_tolerance)?;
            let analysis = priority::analyze(&matrix)?;
            write_json(&out, &analysis)?;
        }
        Commands::RandomIndex => {
            for (idx, ri) in RANDOM_INDEX.iter().enumerate() {
                println!("{}\t{ri}", idx + 1);
            }
        }
    }

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}
