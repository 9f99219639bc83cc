//! Waveform job description received from the trigger

use scrubwave_core::Rgb;
use scrubwave_loudness::AudioSource;
use scrubwave_waveform::MAX_IMAGE_DIMENSION;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// One waveform request
///
/// Optional fields fall back to [`PipelineConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformJob {
    /// HTTP(S) URL or local path of the audio
    pub audio_url: String,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
    /// Bars of the primary image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<Rgb>,
    /// Bars of the secondary image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgb>,
}

/// Image geometry plus the two bar colors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub primary_color: Rgb,
    pub secondary_color: Rgb,
}

impl ImageSpec {
    /// Reject geometry the rasterizer cannot allocate
    pub fn validate(&self) -> Result<(), PipelineError> {
        let in_range = |v: u32| (1..=MAX_IMAGE_DIMENSION).contains(&v);
        if !in_range(self.width) || !in_range(self.height) {
            return Err(PipelineError::InvalidArgument(format!(
                "image size must be between 1x1 and {max}x{max}, got {}x{}",
                self.width,
                self.height,
                max = MAX_IMAGE_DIMENSION
            )));
        }
        Ok(())
    }
}

/// A job with every default filled in
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    pub source: AudioSource,
    pub duration_seconds: f64,
    pub sample_count: usize,
    pub image: ImageSpec,
}

impl WaveformJob {
    pub fn new(audio_url: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            audio_url: audio_url.into(),
            duration_seconds,
            sample_count: None,
            image_width: None,
            image_height: None,
            foreground_color: None,
            background_color: None,
        }
    }

    /// Parse a job from its JSON form
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json)
            .map_err(|e| PipelineError::InvalidArgument(format!("malformed job: {}", e)))
    }

    /// Fill missing fields from `config`
    ///
    /// Duration and sample count are checked later by the planner.
    pub fn resolve(&self, config: &PipelineConfig) -> Result<ResolvedJob, PipelineError> {
        let location = self.audio_url.trim();
        if location.is_empty() {
            return Err(PipelineError::InvalidArgument(
                "audioUrl must not be empty".to_string(),
            ));
        }

        let defaults = config.default_image();
        let image = ImageSpec {
            width: self.image_width.unwrap_or(defaults.width),
            height: self.image_height.unwrap_or(defaults.height),
            primary_color: self.foreground_color.unwrap_or(defaults.primary_color),
            secondary_color: self.background_color.unwrap_or(defaults.secondary_color),
        };
        image.validate()?;

        Ok(ResolvedJob {
            source: AudioSource::from_location(location),
            duration_seconds: self.duration_seconds,
            sample_count: self.sample_count.unwrap_or(config.sample_count),
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camel_case_job() {
        let job = WaveformJob::from_json(
            r##"{
                "audioUrl": "https://cdn.example.com/ep1.mp3",
                "durationSeconds": 1830.5,
                "sampleCount": 200,
                "imageWidth": 1000,
                "foregroundColor": "#112233"
            }"##,
        )
        .unwrap();

        assert_eq!(job.duration_seconds, 1830.5);
        assert_eq!(job.sample_count, Some(200));
        assert_eq!(job.image_height, None);
        assert_eq!(job.foreground_color, Some(Rgb::new(0x11, 0x22, 0x33)));
    }

    #[test]
    fn test_resolve_falls_back_to_config() {
        let config = PipelineConfig::default();
        let mut job = WaveformJob::new("https://cdn.example.com/ep1.mp3", 60.0);
        job.image_width = Some(400);

        let resolved = job.resolve(&config).unwrap();
        assert_eq!(resolved.sample_count, 100);
        assert_eq!(resolved.image.width, 400);
        assert_eq!(resolved.image.height, 100);
        assert_eq!(resolved.image.primary_color, config.primary_color);
        assert!(matches!(resolved.source, AudioSource::Url(_)));
    }

    #[test]
    fn test_malformed_job_is_invalid_argument() {
        for bad in [
            r#"{"durationSeconds": 10}"#,
            r#"{"audioUrl": "a.mp3", "durationSeconds": 10, "foregroundColor": "red"}"#,
            "not json",
        ] {
            assert!(matches!(
                WaveformJob::from_json(bad),
                Err(PipelineError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_oversized_image_is_rejected() {
        let mut job = WaveformJob::new("https://cdn.example.com/ep1.mp3", 60.0);
        job.image_width = Some(u32::MAX);
        assert!(matches!(
            job.resolve(&PipelineConfig::default()),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let job = WaveformJob::new("  ", 10.0);
        assert!(job.resolve(&PipelineConfig::default()).is_err());
    }
}
