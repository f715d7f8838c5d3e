use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use sd_safety_pipeline::config::PipelineConfig;
use sd_safety_pipeline::pipeline;

#[derive(Parser, Debug)]
#[command(name = "sd-safety-pipeline")]
#[command(about = "San Diego public-safety data pipeline: fetch, canonicalize, aggregate, validate")]
struct Args {
    /// Root directory for raw, processed, and aggregated data
    #[arg(long, env = "SD_PIPELINE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Re-download raw artifacts even when a cached copy exists
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let args = Args::parse();
    let cfg = PipelineConfig::new(&args.data_dir);

    info!("data dir: {}", args.data_dir.display());
    info!("cfs years: {:?}", cfg.cfs_years());

    let run = pipeline::run(&cfg, args.force).await?;

    let issues = run.report.issues();
    if issues > 0 {
        error!("pipeline finished with {issues} data-quality issues");
        return Ok(ExitCode::FAILURE);
    }
    info!("pipeline finished clean");
    Ok(ExitCode::SUCCESS)
}
