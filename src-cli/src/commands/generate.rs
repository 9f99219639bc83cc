//! `scrubwave generate`

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use scrubwave_core::Rgb;
use scrubwave_pipeline::{
    AnalyzerBackend, ArtifactSink, DirectorySink, PipelineConfig, PipelineCoordinator,
    PipelineError, WaveformJob,
};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AnalyzerArg {
    Symphonia,
    Ffmpeg,
}

impl From<AnalyzerArg> for AnalyzerBackend {
    fn from(arg: AnalyzerArg) -> Self {
        match arg {
            AnalyzerArg::Symphonia => AnalyzerBackend::Symphonia,
            AnalyzerArg::Ffmpeg => AnalyzerBackend::Ffmpeg,
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Job description (JSON); flags below override its fields
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Audio URL or local file
    #[arg(long)]
    pub url: Option<String>,

    /// Audio duration in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Number of time points to sample
    #[arg(long)]
    pub samples: Option<usize>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Bar color of the primary image, e.g. #ff5500
    #[arg(long)]
    pub primary_color: Option<Rgb>,

    /// Bar color of the secondary image
    #[arg(long)]
    pub secondary_color: Option<Rgb>,

    #[arg(long, value_enum, env = "SCRUBWAVE_ANALYZER")]
    pub analyzer: Option<AnalyzerArg>,

    /// Analysis budget in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output directory for the artifacts
    #[arg(short, long)]
    pub out: PathBuf,
}

impl GenerateArgs {
    /// Build the job from `--job` and the field flags
    pub fn to_job(&self) -> anyhow::Result<WaveformJob> {
        let mut job = match &self.job {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading job file {}", path.display()))?;
                WaveformJob::from_json(&json)?
            }
            None => {
                let url = self.url.clone().ok_or_else(|| {
                    PipelineError::InvalidArgument("--url or --job is required".to_string())
                })?;
                let duration = self.duration.ok_or_else(|| {
                    PipelineError::InvalidArgument("--duration or --job is required".to_string())
                })?;
                WaveformJob::new(url, duration)
            }
        };

        if let Some(url) = &self.url {
            job.audio_url = url.clone();
        }
        if let Some(duration) = self.duration {
            job.duration_seconds = duration;
        }
        job.sample_count = self.samples.or(job.sample_count);
        job.image_width = self.width.or(job.image_width);
        job.image_height = self.height.or(job.image_height);
        job.foreground_color = self.primary_color.or(job.foreground_color);
        job.background_color = self.secondary_color.or(job.background_color);

        Ok(job)
    }

    /// Apply analyzer overrides to `config`
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(analyzer) = self.analyzer {
            config.analyzer = analyzer.into();
        }
        if let Some(timeout) = self.timeout {
            config.analysis_timeout_secs = timeout;
        }
    }
}

pub async fn run(args: GenerateArgs, mut config: PipelineConfig) -> anyhow::Result<()> {
    let job = args.to_job()?;
    args.apply_to(&mut config);

    let coordinator = PipelineCoordinator::from_config(config)?;
    let artifacts = coordinator
        .run_with_progress(&job, |stage| info!("Stage: {}", stage))
        .await?;

    let manifest = DirectorySink::new(&args.out).persist(&artifacts).await?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: GenerateArgs,
    }

    fn parse(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["generate"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_job_from_flags() {
        let args = parse(&[
            "--url",
            "https://cdn.example.com/ep.mp3",
            "--duration",
            "95.5",
            "--primary-color",
            "#00ff00",
            "--out",
            "/tmp/out",
        ]);
        let job = args.to_job().unwrap();
        assert_eq!(job.audio_url, "https://cdn.example.com/ep.mp3");
        assert_eq!(job.duration_seconds, 95.5);
        assert_eq!(job.foreground_color, Some(Rgb::new(0, 255, 0)));
        assert_eq!(job.sample_count, None);
    }

    #[test]
    fn test_flags_override_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(
            &path,
            r#"{"audioUrl": "a.wav", "durationSeconds": 12, "sampleCount": 50, "imageWidth": 300}"#,
        )
        .unwrap();

        let args = parse(&[
            "--job",
            path.to_str().unwrap(),
            "--samples",
            "20",
            "--out",
            "/tmp/out",
        ]);
        let job = args.to_job().unwrap();
        assert_eq!(job.audio_url, "a.wav");
        assert_eq!(job.sample_count, Some(20));
        assert_eq!(job.image_width, Some(300));
    }

    #[test]
    fn test_missing_url_is_invalid_argument() {
        let args = parse(&["--duration", "10", "--out", "/tmp/out"]);
        let err = args.to_job().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_analyzer_override() {
        let args = parse(&["--analyzer", "ffmpeg", "--timeout", "60", "--out", "/tmp/out"]);
        let mut config = PipelineConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.analyzer, AnalyzerBackend::Ffmpeg);
        assert_eq!(config.analysis_timeout_secs, 60);
    }
}
