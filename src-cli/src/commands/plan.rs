//! `scrubwave plan`

use clap::Args;
use scrubwave_core::TimePointPlanner;
use scrubwave_pipeline::{PipelineConfig, PipelineError};

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Audio duration in seconds
    #[arg(long)]
    pub duration: f64,

    /// Number of time points; defaults to the configured sample count
    #[arg(long)]
    pub samples: Option<usize>,
}

pub fn run(args: PlanArgs, config: &PipelineConfig) -> anyhow::Result<()> {
    let sample_count = args.samples.unwrap_or(config.sample_count);
    let plan = TimePointPlanner::plan(args.duration, sample_count).map_err(PipelineError::from)?;

    println!("{}", serde_json::to_string(&plan)?);
    Ok(())
}
