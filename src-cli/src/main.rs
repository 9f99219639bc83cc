//! scrubwave command-line application
//!
//! Generates scrub-bar waveform images from audio, re-renders them from a
//! persisted loudness series, or prints a time-point plan.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use scrubwave_pipeline::{ErrorKind, PipelineConfig, PipelineError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{GenerateArgs, PlanArgs, RenderArgs};

/// Exit code used when the run is interrupted
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "scrubwave", version)]
#[command(about = "Loudness waveform images for media scrub bars", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "SCRUBWAVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample an audio file and write both waveform images
    Generate(GenerateArgs),
    /// Redraw both images from a persisted raw loudness series
    Render(RenderArgs),
    /// Print the time points a job would sample
    Plan(PlanArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{:#}", e);
                ExitCode::from(exit_code(&e))
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, abandoning run");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args, config).await,
        Commands::Render(args) => commands::render::run(args, config).await,
        Commands::Plan(args) => commands::plan::run(args, &config),
    }
}

/// Map a failure onto the process exit code
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PipelineError>().map(PipelineError::kind) {
        Some(ErrorKind::InvalidArgument) => 2,
        Some(ErrorKind::Fetch) => 3,
        Some(ErrorKind::Decode) => 4,
        Some(ErrorKind::AnalysisTimeout) => 5,
        _ => 1,
    }
}
