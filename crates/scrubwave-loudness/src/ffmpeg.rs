//! External analyzer: one ffmpeg process per run
//!
//! The stream is piped into ffmpeg's stdin. A single filter graph splits the
//! decoded audio once per window, trims each copy to its window and runs
//! `volumedetect` on it; the `mean_volume` lines ffmpeg prints on stderr are
//! the readings.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::analyzer::AudioAnalyzer;
use crate::error::LoudnessError;
use crate::stream::AudioStream;
use crate::window::AnalysisWindow;

/// Default executable name, resolved through `PATH`
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Lines of stderr quoted in error messages
const STDERR_TAIL_LINES: usize = 5;

static MEAN_VOLUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Parsed_volumedetect_(\d+)[^\]]*\]\s*)?mean_volume:\s*(-?(?:inf|\d+(?:\.\d+)?))\s*dB")
        .expect("mean_volume pattern is valid")
});

/// Analyzer that shells out to ffmpeg's `volumedetect` filter
#[derive(Debug, Clone)]
pub struct FfmpegAnalyzer {
    ffmpeg_path: PathBuf,
}

impl FfmpegAnalyzer {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

impl AudioAnalyzer for FfmpegAnalyzer {
    async fn analyze(
        &self,
        mut stream: AudioStream,
        windows: &[AnalysisWindow],
    ) -> Result<Vec<f64>, LoudnessError> {
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let filter = build_filter_graph(windows);
        debug!("ffmpeg filter graph: {}", filter);

        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-nostats", "-i", "pipe:0", "-filter_complex"])
            .arg(&filter)
            .args(["-f", "null", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                LoudnessError::AnalyzerUnavailable(format!("{}: {}", self.ffmpeg_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LoudnessError::AnalyzerUnavailable("ffmpeg stdin not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LoudnessError::AnalyzerUnavailable("ffmpeg stderr not captured".to_string()))?;

        info!("Started ffmpeg analysis of {} windows", windows.len());

        let feed = async move {
            let mut written: u64 = 0;
            while let Some(chunk) = stream.next_chunk().await {
                // Read errors are reported by the reader side
                let Ok(bytes) = chunk else { break };
                if let Err(e) = stdin.write_all(&bytes).await {
                    debug!("ffmpeg closed stdin after {} bytes: {}", written, e);
                    break;
                }
                written += bytes.len() as u64;
            }
            drop(stdin);
            written
        };

        let collect = async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        };

        let (written, stderr_bytes) = tokio::join!(feed, collect);
        let stderr_bytes = stderr_bytes
            .map_err(|e| LoudnessError::DecodeFailed(format!("reading ffmpeg output: {}", e)))?;

        let status = child
            .wait()
            .await
            .map_err(|e| LoudnessError::DecodeFailed(format!("waiting for ffmpeg: {}", e)))?;

        let output = String::from_utf8_lossy(&stderr_bytes);
        let readings = parse_mean_volumes(&output);

        if !status.success() && readings.is_empty() {
            warn!("ffmpeg failed with {}", status);
            return Err(LoudnessError::DecodeFailed(format!(
                "ffmpeg exited with {}: {}",
                status,
                stderr_tail(&output)
            )));
        }

        debug!(
            "ffmpeg read {} bytes and reported {} of {} readings",
            written,
            readings.len(),
            windows.len()
        );

        Ok(readings)
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// `[0:a]asplit=N[a0]...[aN-1];[a0]atrim=start=S:end=E,volumedetect;...`
pub fn build_filter_graph(windows: &[AnalysisWindow]) -> String {
    let outputs: String = (0..windows.len()).map(|i| format!("[a{}]", i)).collect();

    let segments: Vec<String> = windows
        .iter()
        .enumerate()
        .map(|(i, w)| format!("[a{}]atrim=start={}:end={},volumedetect", i, w.start, w.end))
        .collect();

    format!("[0:a]asplit={}{};{}", windows.len(), outputs, segments.join(";"))
}

/// Extract `mean_volume` readings in window order
///
/// Each filter instance is tagged `Parsed_volumedetect_<n>` with `n` growing
/// in graph order, which is window order. When every line carries the tag the
/// readings are sorted by it; otherwise output order is used.
pub fn parse_mean_volumes(output: &str) -> Vec<f64> {
    let mut entries: Vec<(Option<usize>, f64)> = MEAN_VOLUME
        .captures_iter(output)
        .filter_map(|caps| {
            let instance = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let value = caps.get(2)?.as_str().parse::<f64>().ok()?;
            Some((instance, value))
        })
        .collect();

    if entries.iter().all(|(instance, _)| instance.is_some()) {
        entries.sort_by_key(|(instance, _)| *instance);
    }

    entries.into_iter().map(|(_, value)| value).collect()
}

fn stderr_tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join(" | ")
}
