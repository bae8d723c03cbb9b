use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use callscope::cli::{Cli, Commands, OutputFormat};
use callscope::config::AnalysisConfig;
use callscope::engine::CampaignIntelligence;
use callscope::{formatting, io};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            records,
            previous,
            campaign,
            config,
            format,
            output,
            top,
        } => analyze(records, previous, campaign, config, format, output, top),
        Commands::Status { records, campaign } => status(records, campaign),
    }
}

#[allow(clippy::too_many_arguments)]
fn analyze(
    records_path: PathBuf,
    previous_path: Option<PathBuf>,
    campaign_path: PathBuf,
    config_path: Option<PathBuf>,
    format: OutputFormat,
    output: Option<PathBuf>,
    top: Option<usize>,
) -> anyhow::Result<()> {
    let campaign = io::load_campaign(&campaign_path)?;
    let config = match config_path {
        Some(path) => AnalysisConfig::from_toml_file(&path)?,
        None => AnalysisConfig::default(),
    };

    let records = io::load_records(&records_path)?;
    io::validate_records(&records).context("current period records failed validation")?;
    let previous = match previous_path {
        Some(path) => {
            let records = io::load_records(&path)?;
            io::validate_records(&records).context("previous period records failed validation")?;
            Some(records)
        }
        None => None,
    };

    let engine = CampaignIntelligence::new(campaign.clone(), config)?;
    let mut report = engine.analyze(&records, previous.as_deref())?;
    if let Some(top) = top {
        report.recommendations.truncate(top);
    }

    let rendered = match format {
        OutputFormat::Terminal => formatting::render_report(&report, &campaign),
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
    };
    emit(&rendered, output.as_deref())
}

fn status(records_path: PathBuf, campaign_path: PathBuf) -> anyhow::Result<()> {
    let campaign = io::load_campaign(&campaign_path)?;
    let records = io::load_records(&records_path)?;
    io::validate_records(&records)?;

    let engine = CampaignIntelligence::new(campaign, AnalysisConfig::default())?;
    let status = engine.quick_status(&records)?;
    print!("{}", formatting::render_quick_status(&status));
    Ok(())
}

fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => print!("{content}"),
    }
    Ok(())
}
