//! Audio sources and the reader that pumps them into the analysis pipe

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::LoudnessError;
use crate::stream::{Chunk, StreamHint};

/// Chunk size used when slicing in-memory sources
const MEMORY_CHUNK_BYTES: usize = 64 * 1024;

/// Where the audio comes from
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Publicly fetchable HTTP(S) URL
    Url(String),
    /// Local file
    File(PathBuf),
    /// Already-loaded bytes
    Memory {
        data: Bytes,
        extension: Option<String>,
    },
}

impl AudioSource {
    /// `http://` and `https://` locations become URLs, anything else a file path
    pub fn from_location(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            AudioSource::Url(location.to_string())
        } else {
            AudioSource::File(PathBuf::from(location))
        }
    }

    /// Short description for log lines
    pub fn describe(&self) -> String {
        match self {
            AudioSource::Url(url) => url.clone(),
            AudioSource::File(path) => path.display().to_string(),
            AudioSource::Memory { data, .. } => format!("<{} bytes in memory>", data.len()),
        }
    }
}

/// An opened source: decoder hints plus the body still to be read
pub struct OpenedSource {
    pub hint: StreamHint,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, io::Result<Bytes>>,
}

/// Opens audio sources; owns the HTTP client
#[derive(Clone)]
pub struct AudioFetcher {
    client: reqwest::Client,
}

impl AudioFetcher {
    /// Create a fetcher with its own HTTP client
    pub fn new(user_agent: &str) -> Result<Self, LoudnessError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| LoudnessError::FetchFailed(e.to_string()))?;

        Ok(Self { client })
    }

    /// Open `source` for a single forward read
    ///
    /// For URLs this sends the request and checks the status, so an
    /// unreachable or missing file fails here before any analysis starts.
    pub async fn open(&self, source: &AudioSource) -> Result<OpenedSource, LoudnessError> {
        match source {
            AudioSource::Url(url) => self.open_url(url).await,
            AudioSource::File(path) => open_file(path).await,
            AudioSource::Memory { data, extension } => {
                let chunks: Vec<io::Result<Bytes>> = (0..data.len())
                    .step_by(MEMORY_CHUNK_BYTES)
                    .map(|start| Ok(data.slice(start..(start + MEMORY_CHUNK_BYTES).min(data.len()))))
                    .collect();

                Ok(OpenedSource {
                    hint: StreamHint {
                        extension: extension.clone(),
                        mime_type: None,
                    },
                    content_length: Some(data.len() as u64),
                    body: stream::iter(chunks).boxed(),
                })
            }
        }
    }

    async fn open_url(&self, url: &str) -> Result<OpenedSource, LoudnessError> {
        info!("Fetching audio from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(LoudnessError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        let extension = extension_of(Path::new(response.url().path()));
        let content_length = response.content_length();

        debug!(
            "Audio response: type={:?} ext={:?} length={:?}",
            mime_type, extension, content_length
        );

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other))
            .boxed();

        Ok(OpenedSource {
            hint: StreamHint {
                extension,
                mime_type,
            },
            content_length,
            body,
        })
    }
}

async fn open_file(path: &Path) -> Result<OpenedSource, LoudnessError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| LoudnessError::FetchFailed(format!("{}: {}", path.display(), e)))?;

    let content_length = file.metadata().await.ok().map(|m| m.len());

    Ok(OpenedSource {
        hint: StreamHint {
            extension: extension_of(path),
            mime_type: None,
        },
        content_length,
        body: ReaderStream::new(file).boxed(),
    })
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Copy `body` into the pipe until it ends, the analyzer hangs up, or a read fails
///
/// Returns the number of bytes delivered. A closed pipe is not an error: the
/// analyzer may stop early once every window is measured.
pub async fn pump(
    mut body: BoxStream<'static, io::Result<Bytes>>,
    tx: mpsc::Sender<Chunk>,
) -> Result<u64, LoudnessError> {
    let mut delivered: u64 = 0;

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                let len = bytes.len() as u64;
                if tx.send(Ok(bytes)).await.is_err() {
                    debug!("Analyzer stopped reading after {} bytes", delivered);
                    return Ok(delivered);
                }
                delivered += len;
            }
            Err(e) => {
                let message = e.to_string();
                let _ = tx.send(Err(io::Error::new(e.kind(), message.clone()))).await;
                return Err(LoudnessError::FetchFailed(format!(
                    "read failed after {} bytes: {}",
                    delivered, message
                )));
            }
        }
    }

    Ok(delivered)
}
