//! Analyzer capability shared by the in-process and external decoders

use crate::error::LoudnessError;
use crate::stream::AudioStream;
use crate::window::AnalysisWindow;

/// Level assigned to -60 dBFS and below
const FLOOR_DB: f64 = -60.0;

/// Measures windowed loudness of an encoded audio stream
#[trait_variant::make(AudioAnalyzer: Send)]
pub trait LocalAudioAnalyzer {
    /// Mean loudness in dBFS for each window, in window order
    ///
    /// The stream is read once, front to back. When the audio ends before the
    /// last windows, fewer readings than windows are returned.
    async fn analyze(
        &self,
        stream: AudioStream,
        windows: &[AnalysisWindow],
    ) -> Result<Vec<f64>, LoudnessError>;

    /// Analyzer name for logs
    fn name(&self) -> &'static str;
}

/// Map dBFS onto `[0, 1]`: -60 dB and below is 0, 0 dB is 1
///
/// Levels are kept to four decimal places.
pub fn db_to_level(db: f64) -> f64 {
    if db.is_nan() {
        return 0.0;
    }
    let level = ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0);
    (level * 10_000.0).round() / 10_000.0
}
