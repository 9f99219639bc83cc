//! In-process analyzer built on symphonia

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tracing::{debug, info, warn};

use crate::analyzer::AudioAnalyzer;
use crate::error::LoudnessError;
use crate::stream::AudioStream;
use crate::window::{AnalysisWindow, WindowAccumulator};

/// Decodes the stream on a blocking thread and measures every window in one pass
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaAnalyzer;

impl SymphoniaAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioAnalyzer for SymphoniaAnalyzer {
    async fn analyze(
        &self,
        stream: AudioStream,
        windows: &[AnalysisWindow],
    ) -> Result<Vec<f64>, LoudnessError> {
        let windows = windows.to_vec();

        tokio::task::spawn_blocking(move || analyze_blocking(stream, windows))
            .await
            .map_err(|e| LoudnessError::DecodeFailed(format!("decoder task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "symphonia"
    }
}

/// Decode `stream` front to back, feeding every frame to the window accumulator
fn analyze_blocking(
    stream: AudioStream,
    windows: Vec<AnalysisWindow>,
) -> Result<Vec<f64>, LoudnessError> {
    let stream_hint = stream.hint().clone();
    let reader = stream.into_blocking_reader();
    let mss = MediaSourceStream::new(Box::new(ReadOnlySource::new(reader)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = stream_hint.extension.as_deref() {
        hint.with_extension(ext);
    }
    if let Some(mime) = stream_hint.mime_type.as_deref() {
        hint.mime_type(mime);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| LoudnessError::DecodeFailed(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| LoudnessError::DecodeFailed("No audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| LoudnessError::DecodeFailed(format!("Decoder error: {}", e)))?;

    info!(
        "Decoding {:?} stream at {:?} Hz",
        stream_hint.extension.as_deref().or(stream_hint.mime_type.as_deref()),
        codec_params.sample_rate
    );

    let time_base = codec_params.time_base;
    let mut accumulator = WindowAccumulator::new(windows);
    let mut frame_index: u64 = 0;
    let mut decoded_packets: u64 = 0;
    let mut failed_packets: u64 = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                warn!("Audio stream ended early: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping corrupt packet: {}", e);
                failed_packets += 1;
                continue;
            }
            Err(e) => {
                warn!("Decoder stopped: {}", e);
                break;
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let rate = f64::from(spec.rate);
        let start = packet_start(packet.ts(), time_base, frame_index, rate);

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for (offset, frame) in sample_buf.samples().chunks(channels).enumerate() {
            let energy: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
            accumulator.push_frame(start + offset as f64 / rate, energy, frame.len() as u32);
            frame_index += 1;
        }

        decoded_packets += 1;

        if accumulator.is_done() {
            debug!("All windows measured after {} frames, stopping early", frame_index);
            break;
        }
    }

    if decoded_packets == 0 && failed_packets > 0 {
        return Err(LoudnessError::DecodeFailed(format!(
            "none of {} audio packets could be decoded",
            failed_packets
        )));
    }

    let readings = accumulator.finish();
    debug!(
        "Decoded {} packets ({} frames, {} skipped), {} window readings",
        decoded_packets,
        frame_index,
        failed_packets,
        readings.len()
    );

    Ok(readings)
}

/// Start of a packet in seconds
///
/// Taken from the packet timestamp so skipped packets leave a gap instead of
/// pulling later audio earlier. Without a time base, decoded frames are counted.
fn packet_start(ts: u64, time_base: Option<TimeBase>, decoded_frames: u64, rate: f64) -> f64 {
    match time_base {
        Some(tb) => {
            let time = tb.calc_time(ts);
            time.seconds as f64 + time.frac
        }
        None => decoded_frames as f64 / rate,
    }
}
