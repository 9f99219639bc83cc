//! Artifact persistence

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use scrubwave_core::{LoudnessSeries, Rgb};
use scrubwave_waveform::WaveformVariant;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::coordinator::WaveformArtifactSet;
use crate::error::PipelineError;

/// Compressed series file name
pub const LOUDNESS_FILE: &str = "loudness.json";
/// Uncompressed series file name
pub const LOUDNESS_RAW_FILE: &str = "loudness_raw.json";
/// Manifest file name
pub const MANIFEST_FILE: &str = "manifest.json";

/// Description of one persisted artifact set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    pub primary_image: String,
    pub secondary_image: String,
    pub loudness: String,
    pub loudness_raw: String,
    pub width: u32,
    pub height: u32,
    pub primary_color: Rgb,
    pub secondary_color: Rgb,
    pub sample_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl ArtifactManifest {
    pub fn for_artifacts(artifacts: &WaveformArtifactSet) -> Self {
        Self {
            primary_image: WaveformVariant::Primary.file_name().to_string(),
            secondary_image: WaveformVariant::Secondary.file_name().to_string(),
            loudness: LOUDNESS_FILE.to_string(),
            loudness_raw: LOUDNESS_RAW_FILE.to_string(),
            width: artifacts.image.width,
            height: artifacts.image.height,
            primary_color: artifacts.image.primary_color,
            secondary_color: artifacts.image.secondary_color,
            sample_count: artifacts.series.len(),
            generated_at: Utc::now(),
        }
    }
}

/// Hands a finished artifact set to storage
#[trait_variant::make(ArtifactSink: Send)]
pub trait LocalArtifactSink {
    async fn persist(&self, artifacts: &WaveformArtifactSet) -> Result<ArtifactManifest, PipelineError>;
}

/// Writes artifacts as plain files into one directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn temp_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.tmp", name))
    }

    /// Write every file under its `.tmp` name; on failure remove what was staged
    async fn stage(&self, files: &[(&str, Vec<u8>)]) -> Result<(), PipelineError> {
        for (index, (name, data)) in files.iter().enumerate() {
            let temp_path = self.temp_path(name);
            if let Err(e) = fs::write(&temp_path, data).await {
                self.discard(files[..=index].iter().map(|(n, _)| *n)).await;
                return Err(persist_error(&temp_path, e));
            }
        }
        Ok(())
    }

    async fn discard(&self, names: impl Iterator<Item = &str>) {
        for name in names {
            let temp_path = self.temp_path(name);
            if let Err(e) = fs::remove_file(&temp_path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Could not remove {}: {}", temp_path.display(), e);
                }
            }
        }
    }
}

impl ArtifactSink for DirectorySink {
    async fn persist(&self, artifacts: &WaveformArtifactSet) -> Result<ArtifactManifest, PipelineError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| persist_error(&self.dir, e))?;

        // A manifest marks a complete set, so an older one must go before any file changes
        let manifest_path = self.dir.join(MANIFEST_FILE);
        match fs::remove_file(&manifest_path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(persist_error(&manifest_path, e)),
            _ => {}
        }

        let manifest = ArtifactManifest::for_artifacts(artifacts);
        let files = [
            (
                WaveformVariant::Primary.file_name(),
                artifacts.png(WaveformVariant::Primary).to_vec(),
            ),
            (
                WaveformVariant::Secondary.file_name(),
                artifacts.png(WaveformVariant::Secondary).to_vec(),
            ),
            (LOUDNESS_FILE, to_json(&artifacts.series)?),
            (LOUDNESS_RAW_FILE, to_json(&artifacts.raw_series)?),
            // Last: renamed into place only once everything else is
            (MANIFEST_FILE, to_json(&manifest)?),
        ];

        self.stage(&files).await?;

        for (index, (name, data)) in files.iter().enumerate() {
            let dest_path = self.dir.join(name);
            if let Err(e) = fs::rename(self.temp_path(name), &dest_path).await {
                self.discard(files[index..].iter().map(|(n, _)| *n)).await;
                return Err(persist_error(&dest_path, e));
            }
            debug!("Wrote {} ({} bytes)", dest_path.display(), data.len());
        }

        info!("Artifacts written to {}", self.dir.display());
        Ok(manifest)
    }
}

/// Read a series persisted as `loudness.json` or `loudness_raw.json`
pub async fn read_series(path: &Path) -> Result<LoudnessSeries, PipelineError> {
    let data = fs::read(path)
        .await
        .map_err(|e| PipelineError::InvalidArgument(format!("{}: {}", path.display(), e)))?;

    serde_json::from_slice(&data)
        .map_err(|e| PipelineError::InvalidArgument(format!("{}: {}", path.display(), e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, PipelineError> {
    serde_json::to_vec_pretty(value).map_err(|e| PipelineError::Persist(e.to_string()))
}

fn persist_error(path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::Persist(format!("{}: {}", path.display(), err))
}
