//! Analyzer chosen by configuration

use scrubwave_loudness::{
    AnalysisWindow, AudioAnalyzer, AudioStream, FfmpegAnalyzer, LoudnessError, SymphoniaAnalyzer,
};

use crate::config::{AnalyzerBackend, PipelineConfig};

/// Either analyzer, selected at runtime
#[derive(Debug, Clone)]
pub enum BackendAnalyzer {
    Symphonia(SymphoniaAnalyzer),
    Ffmpeg(FfmpegAnalyzer),
}

impl BackendAnalyzer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        match config.analyzer {
            AnalyzerBackend::Symphonia => BackendAnalyzer::Symphonia(SymphoniaAnalyzer::new()),
            AnalyzerBackend::Ffmpeg => {
                BackendAnalyzer::Ffmpeg(FfmpegAnalyzer::new(config.ffmpeg_path.clone()))
            }
        }
    }
}

impl AudioAnalyzer for BackendAnalyzer {
    async fn analyze(
        &self,
        stream: AudioStream,
        windows: &[AnalysisWindow],
    ) -> Result<Vec<f64>, LoudnessError> {
        match self {
            BackendAnalyzer::Symphonia(analyzer) => analyzer.analyze(stream, windows).await,
            BackendAnalyzer::Ffmpeg(analyzer) => analyzer.analyze(stream, windows).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            BackendAnalyzer::Symphonia(analyzer) => analyzer.name(),
            BackendAnalyzer::Ffmpeg(analyzer) => analyzer.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_follows_config() {
        let mut config = PipelineConfig::default();
        assert_eq!(BackendAnalyzer::from_config(&config).name(), "symphonia");

        config.analyzer = AnalyzerBackend::Ffmpeg;
        assert_eq!(BackendAnalyzer::from_config(&config).name(), "ffmpeg");
    }
}
