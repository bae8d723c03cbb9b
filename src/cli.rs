use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "callscope",
    about = "Voice bot campaign performance and revenue leakage analyzer",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full analysis: metrics, health score, issues, leakage,
    /// recommendations, and period-over-period alerts
    Analyze {
        /// JSON file with the current period's call records
        records: PathBuf,

        /// JSON file with the previous period's records, for comparison
        #[arg(long)]
        previous: Option<PathBuf>,

        /// JSON file with the campaign configuration
        #[arg(long)]
        campaign: PathBuf,

        /// TOML file overriding analysis thresholds and weights
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "terminal")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Keep only the top N recommendations
        #[arg(long)]
        top: Option<usize>,
    },

    /// Quick health check without issue or leakage analysis
    Status {
        /// JSON file with the period's call records
        records: PathBuf,

        /// JSON file with the campaign configuration
        #[arg(long)]
        campaign: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Terminal,
    Json,
}
