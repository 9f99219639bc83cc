//! Waveform run orchestration
//!
//! A run is strictly sequential: plan, sample, compress, then rasterize the
//! primary and secondary variants. Any failure aborts the run and no
//! artifacts are returned.

use std::time::Instant;

use scrubwave_core::{DynamicRangeCompressor, LoudnessSeries, Rgb, TimePointPlanner};
use scrubwave_loudness::{AudioAnalyzer, AudioFetcher, LoudnessSampler};
use scrubwave_waveform::{WaveformRasterizer, WaveformVariant};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::BackendAnalyzer;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::job::{ImageSpec, WaveformJob};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "variant")]
pub enum PipelineStage {
    Planning,
    Sampling,
    Compressing,
    Rasterizing(WaveformVariant),
    Complete,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Planning => write!(f, "planning"),
            PipelineStage::Sampling => write!(f, "sampling"),
            PipelineStage::Compressing => write!(f, "compressing"),
            PipelineStage::Rasterizing(variant) => write!(f, "rasterizing {}", variant),
            PipelineStage::Complete => write!(f, "complete"),
            PipelineStage::Failed => write!(f, "failed"),
        }
    }
}

/// Everything a successful run hands to persistence
#[derive(Debug, Clone)]
pub struct WaveformArtifactSet {
    /// PNG with primary-color bars
    pub primary_png: Vec<u8>,
    /// PNG with secondary-color bars, same geometry
    pub secondary_png: Vec<u8>,
    /// The compressed series the images were drawn from
    pub series: LoudnessSeries,
    /// The series before compression, for re-rendering without the audio
    pub raw_series: LoudnessSeries,
    pub image: ImageSpec,
}

impl WaveformArtifactSet {
    pub fn png(&self, variant: WaveformVariant) -> &[u8] {
        match variant {
            WaveformVariant::Primary => &self.primary_png,
            WaveformVariant::Secondary => &self.secondary_png,
        }
    }
}

/// Runs waveform jobs with one configuration
pub struct PipelineCoordinator<A> {
    sampler: LoudnessSampler<A>,
    config: PipelineConfig,
}

impl PipelineCoordinator<BackendAnalyzer> {
    /// Build the analyzer, HTTP client and sampler described by `config`
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let fetcher = AudioFetcher::new(&config.user_agent)?;
        let analyzer = BackendAnalyzer::from_config(&config);
        let sampler = LoudnessSampler::new(analyzer, fetcher, config.sampler_options());

        Ok(Self::new(sampler, config))
    }
}

impl<A: AudioAnalyzer> PipelineCoordinator<A> {
    pub fn new(sampler: LoudnessSampler<A>, config: PipelineConfig) -> Self {
        Self { sampler, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `job` to completion
    pub async fn run(&self, job: &WaveformJob) -> Result<WaveformArtifactSet, PipelineError> {
        self.run_with_progress(job, |_| {}).await
    }

    /// Run `job`, reporting every stage transition to `on_stage`
    ///
    /// The last stage reported is always [`PipelineStage::Complete`] or
    /// [`PipelineStage::Failed`].
    pub async fn run_with_progress<F>(
        &self,
        job: &WaveformJob,
        on_stage: F,
    ) -> Result<WaveformArtifactSet, PipelineError>
    where
        F: Fn(PipelineStage),
    {
        let started = Instant::now();
        let result = self.execute(job, &on_stage).await;

        match &result {
            Ok(artifacts) => {
                info!(
                    "Waveform for {} done in {:?} ({} samples, {} + {} PNG bytes)",
                    job.audio_url,
                    started.elapsed(),
                    artifacts.series.len(),
                    artifacts.primary_png.len(),
                    artifacts.secondary_png.len()
                );
                on_stage(PipelineStage::Complete);
            }
            Err(e) => {
                warn!("Waveform for {} failed: {}", job.audio_url, e);
                on_stage(PipelineStage::Failed);
            }
        }

        result
    }

    async fn execute<F>(
        &self,
        job: &WaveformJob,
        on_stage: &F,
    ) -> Result<WaveformArtifactSet, PipelineError>
    where
        F: Fn(PipelineStage),
    {
        let resolved = job.resolve(&self.config)?;

        on_stage(PipelineStage::Planning);
        let plan = TimePointPlanner::plan(resolved.duration_seconds, resolved.sample_count)?;

        on_stage(PipelineStage::Sampling);
        let raw_series = self.sampler.sample(&resolved.source, &plan).await?;

        render_with_progress(raw_series, &resolved.image, on_stage)
    }

    /// Compress and rasterize a previously sampled series; no audio is read
    pub fn render(
        raw_series: LoudnessSeries,
        image: &ImageSpec,
    ) -> Result<WaveformArtifactSet, PipelineError> {
        render_with_progress(raw_series, image, &|_| {})
    }
}

fn draw(series: &LoudnessSeries, image: &ImageSpec, color: Rgb) -> Result<Vec<u8>, PipelineError> {
    let raster = WaveformRasterizer::rasterize(series, image.width, image.height, color)?;
    Ok(raster.encode_png()?)
}

fn render_with_progress<F>(
    raw_series: LoudnessSeries,
    image: &ImageSpec,
    on_stage: &F,
) -> Result<WaveformArtifactSet, PipelineError>
where
    F: Fn(PipelineStage),
{
    if raw_series.is_empty() {
        return Err(PipelineError::InvalidArgument(
            "loudness series is empty".to_string(),
        ));
    }

    on_stage(PipelineStage::Compressing);
    let series = DynamicRangeCompressor::compress(&raw_series);

    on_stage(PipelineStage::Rasterizing(WaveformVariant::Primary));
    let primary_png = draw(&series, image, image.primary_color)?;

    on_stage(PipelineStage::Rasterizing(WaveformVariant::Secondary));
    let secondary_png = draw(&series, image, image.secondary_color)?;

    Ok(WaveformArtifactSet {
        primary_png,
        secondary_png,
        series,
        raw_series,
        image: *image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrubwave_core::TimePointPlan;
    use scrubwave_loudness::{AnalysisWindow, AudioStream, LoudnessError, SamplerOptions};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedAnalyzer(Result<Vec<f64>, fn() -> LoudnessError>);

    impl AudioAnalyzer for ScriptedAnalyzer {
        async fn analyze(
            &self,
            _stream: AudioStream,
            _windows: &[AnalysisWindow],
        ) -> Result<Vec<f64>, LoudnessError> {
            match &self.0 {
                Ok(readings) => Ok(readings.clone()),
                Err(make) => Err(make()),
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn coordinator(script: Result<Vec<f64>, fn() -> LoudnessError>) -> PipelineCoordinator<ScriptedAnalyzer> {
        let config = PipelineConfig::default();
        let sampler = LoudnessSampler::new(
            ScriptedAnalyzer(script),
            AudioFetcher::new("scrubwave-test").unwrap(),
            SamplerOptions::default(),
        );
        PipelineCoordinator::new(sampler, config)
    }

    fn wav_file() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        std::fs::write(file.path(), b"RIFF").unwrap();
        file
    }

    fn small_job(path: &std::path::Path) -> WaveformJob {
        let mut job = WaveformJob::new(path.to_string_lossy(), 10.0);
        job.sample_count = Some(5);
        job.image_width = Some(40);
        job.image_height = Some(10);
        job
    }

    #[tokio::test]
    async fn test_run_reports_stages_in_order() {
        let file = wav_file();
        let coordinator = coordinator(Ok(vec![-30.0; 5]));
        let stages = Mutex::new(Vec::new());

        let artifacts = coordinator
            .run_with_progress(&small_job(file.path()), |stage| stages.lock().unwrap().push(stage))
            .await
            .unwrap();

        assert_eq!(
            stages.into_inner().unwrap(),
            vec![
                PipelineStage::Planning,
                PipelineStage::Sampling,
                PipelineStage::Compressing,
                PipelineStage::Rasterizing(WaveformVariant::Primary),
                PipelineStage::Rasterizing(WaveformVariant::Secondary),
                PipelineStage::Complete,
            ]
        );
        assert_eq!(artifacts.series.len(), 5);
        assert_eq!(artifacts.raw_series.levels(), vec![0.5; 5]);
        assert!(artifacts.primary_png.starts_with(&[0x89, b'P', b'N', b'G']));
        assert_ne!(artifacts.primary_png, artifacts.secondary_png);
    }

    #[tokio::test]
    async fn test_decode_failure_aborts_with_failed_stage() {
        let file = wav_file();
        let coordinator = coordinator(Err(|| LoudnessError::DecodeFailed("bad frame".to_string())));
        let stages = Mutex::new(Vec::new());

        let err = coordinator
            .run_with_progress(&small_job(file.path()), |stage| stages.lock().unwrap().push(stage))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Decode(_)));
        assert_eq!(
            stages.into_inner().unwrap(),
            vec![PipelineStage::Planning, PipelineStage::Sampling, PipelineStage::Failed]
        );
    }

    #[tokio::test]
    async fn test_invalid_duration_fails_before_sampling() {
        let file = wav_file();
        let coordinator = coordinator(Ok(vec![]));
        let mut job = small_job(file.path());
        job.duration_seconds = 0.0;

        let err = coordinator.run(&job).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
    }

    #[test]
    fn test_render_compresses_before_drawing() {
        let plan = TimePointPlan::from_times(vec![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        let raw = LoudnessSeries::from_plan(&plan, &[0.05, 0.06, 0.5, 0.9, 0.95]).unwrap();
        let image = ImageSpec {
            width: 50,
            height: 20,
            primary_color: Rgb::new(255, 85, 0),
            secondary_color: Rgb::new(0, 0, 0),
        };

        let artifacts = PipelineCoordinator::<BackendAnalyzer>::render(raw.clone(), &image).unwrap();
        let levels = artifacts.series.levels();
        assert!((levels[0] - 0.025).abs() < 1e-12);
        assert!((levels[1] - 0.04).abs() < 1e-12);
        assert_eq!(&levels[2..], &[0.5, 0.9, 0.95]);
        assert_eq!(artifacts.raw_series, raw);
    }

    #[test]
    fn test_render_rejects_empty_series() {
        let image = PipelineConfig::default().default_image();
        let err = PipelineCoordinator::<BackendAnalyzer>::render(LoudnessSeries::default(), &image)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_config_uses_timeout() {
        let mut config = PipelineConfig::default();
        config.analysis_timeout_secs = 7;
        let coordinator = PipelineCoordinator::from_config(config).unwrap();
        assert_eq!(coordinator.config().analysis_timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(
            PipelineStage::Rasterizing(WaveformVariant::Secondary).to_string(),
            "rasterizing secondary"
        );
    }
}
