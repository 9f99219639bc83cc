//! Runtime configuration
//!
//! Resolved once at startup from built-in defaults, an optional TOML file and
//! `SCRUBWAVE_*` environment variables, then passed explicitly to the
//! coordinator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use scrubwave_core::{Rgb, MAX_SAMPLE_COUNT};
use scrubwave_loudness::SamplerOptions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::job::ImageSpec;

/// Prefix of environment variables read by [`PipelineConfig::load`]
pub const ENV_PREFIX: &str = "SCRUBWAVE";

/// Which analyzer decodes the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerBackend {
    /// In-process symphonia decoder
    #[default]
    Symphonia,
    /// External ffmpeg process
    Ffmpeg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub image_width: u32,
    pub image_height: u32,
    /// Bar color of the primary (played) image
    pub primary_color: Rgb,
    /// Bar color of the secondary (unplayed) image
    pub secondary_color: Rgb,
    pub sample_count: usize,
    /// Wall-clock budget for fetching and analyzing one source
    pub analysis_timeout_secs: u64,
    /// Chunks buffered between the network reader and the analyzer
    pub stream_buffer_chunks: usize,
    pub analyzer: AnalyzerBackend,
    pub ffmpeg_path: PathBuf,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_width: 800,
            image_height: 100,
            primary_color: Rgb::new(0xff, 0x55, 0x00),
            secondary_color: Rgb::new(0x00, 0x00, 0x00),
            sample_count: 100,
            analysis_timeout_secs: 300,
            stream_buffer_chunks: 32,
            analyzer: AnalyzerBackend::Symphonia,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            user_agent: format!("scrubwave/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PipelineConfig {
    /// Load configuration, layering `path` (if any) and the environment over the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: PipelineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could succeed with
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.default_image().validate()?;
        if self.sample_count == 0 || self.sample_count > MAX_SAMPLE_COUNT {
            return Err(PipelineError::InvalidArgument(format!(
                "sample_count must be between 1 and {}, got {}",
                MAX_SAMPLE_COUNT, self.sample_count
            )));
        }
        if self.analysis_timeout_secs == 0 {
            return Err(PipelineError::InvalidArgument(
                "analysis_timeout_secs must be positive".to_string(),
            ));
        }
        if self.stream_buffer_chunks == 0 {
            return Err(PipelineError::InvalidArgument(
                "stream_buffer_chunks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn sampler_options(&self) -> SamplerOptions {
        SamplerOptions {
            timeout: self.analysis_timeout(),
            buffer_chunks: self.stream_buffer_chunks,
        }
    }

    /// Image geometry and colors when a job names none
    pub fn default_image(&self) -> ImageSpec {
        ImageSpec {
            width: self.image_width,
            height: self.image_height,
            primary_color: self.primary_color,
            secondary_color: self.secondary_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrubwave_waveform::MAX_IMAGE_DIMENSION;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!((config.image_width, config.image_height), (800, 100));
        assert_eq!(config.primary_color.to_string(), "#ff5500");
        assert_eq!(config.secondary_color.to_string(), "#000000");
        assert_eq!(config.sample_count, 100);
        assert_eq!(config.analysis_timeout(), Duration::from_secs(300));
        assert_eq!(config.analyzer, AnalyzerBackend::Symphonia);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "image_width = 1200\nprimary_color = \"#3366cc\"\nanalyzer = \"ffmpeg\"\nffmpeg_path = \"/opt/ffmpeg/bin/ffmpeg\""
        )
        .unwrap();
        file.flush().unwrap();

        let config = PipelineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.image_width, 1200);
        assert_eq!(config.image_height, 100);
        assert_eq!(config.primary_color, Rgb::new(0x33, 0x66, 0xcc));
        assert_eq!(config.analyzer, AnalyzerBackend::Ffmpeg);
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }

    #[test]
    fn test_load_rejects_bad_color() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "secondary_color = \"black\"").unwrap();
        file.flush().unwrap();

        let err = PipelineConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
    }

    #[test]
    fn test_load_rejects_zero_samples() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "sample_count = 0").unwrap();
        file.flush().unwrap();

        assert!(PipelineConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_values() {
        let mut config = PipelineConfig::default();
        config.sample_count = MAX_SAMPLE_COUNT + 1;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidArgument(_))));

        let mut config = PipelineConfig::default();
        config.image_height = MAX_IMAGE_DIMENSION + 1;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidArgument(_))));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(PipelineConfig::load(Some(Path::new("/no/such/scrubwave.toml"))).is_err());
    }
}
