//! `scrubwave render`

use std::path::PathBuf;

use clap::Args;
use scrubwave_core::Rgb;
use scrubwave_pipeline::{
    read_series, ArtifactSink, BackendAnalyzer, DirectorySink, PipelineConfig,
    PipelineCoordinator,
};
use tracing::info;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Raw loudness series written by `generate` (loudness_raw.json)
    #[arg(long)]
    pub series: PathBuf,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long)]
    pub primary_color: Option<Rgb>,

    #[arg(long)]
    pub secondary_color: Option<Rgb>,

    /// Output directory for the artifacts
    #[arg(short, long)]
    pub out: PathBuf,
}

pub async fn run(args: RenderArgs, config: PipelineConfig) -> anyhow::Result<()> {
    let raw_series = read_series(&args.series).await?;

    let mut image = config.default_image();
    image.width = args.width.unwrap_or(image.width);
    image.height = args.height.unwrap_or(image.height);
    image.primary_color = args.primary_color.unwrap_or(image.primary_color);
    image.secondary_color = args.secondary_color.unwrap_or(image.secondary_color);

    info!(
        "Rendering {} samples at {}x{}",
        raw_series.len(),
        image.width,
        image.height
    );

    let artifacts = PipelineCoordinator::<BackendAnalyzer>::render(raw_series, &image)?;
    let manifest = DirectorySink::new(&args.out).persist(&artifacts).await?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);

    Ok(())
}
