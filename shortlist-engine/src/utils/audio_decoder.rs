//! Audio Decoding Utilities
//!
//! Decodes audio files to mono f32 PCM for feature extraction.
//!
//! Uses symphonia for format-agnostic decoding (MP3, WAV, AIFF, FLAC, ...)

use std::path::Path;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Audio decoding failure
#[derive(Debug, Error)]
pub enum AudioDecodeError {
    #[error("Failed to open audio file: {0}")]
    Open(#[from] std::io::Error),

    #[error("Unsupported or corrupt audio: {0}")]
    Format(String),

    #[error("No audio track found in file")]
    NoTrack,
}

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file to mono f32 PCM samples
///
/// **Algorithm:**
/// 1. Probe the container (extension used as a hint)
/// 2. Decode packets of the first audio track, averaging channels to mono
/// 3. Stop once `max_duration` worth of frames has been collected
///
/// Packets that fail to decode are skipped. A read error after some audio
/// was recovered ends decoding with what was collected so far.
pub fn decode_audio_file(
    file_path: &Path,
    max_duration: Option<Duration>,
) -> Result<DecodedAudio, AudioDecodeError> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioDecodeError::Format(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioDecodeError::NoTrack)?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioDecodeError::Format(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) if samples.is_empty() => {
                return Err(AudioDecodeError::Format(e.to_string()));
            }
            Err(e) => {
                tracing::debug!(path = %file_path.display(), error = %e, "Stopping at read error");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped_packets += 1;
                tracing::trace!(path = %file_path.display(), error = msg, "Skipping corrupt packet");
                continue;
            }
            Err(e) => return Err(AudioDecodeError::Format(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        sample_rate = spec.rate;
        channel_count = channels;

        let needed = decoded.capacity() * channels;
        if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
            sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            samples.extend(
                buf.samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }

        if let Some(limit) = frame_limit(max_duration, sample_rate) {
            if samples.len() >= limit {
                samples.truncate(limit);
                break;
            }
        }
    }

    if skipped_packets > 0 {
        tracing::debug!(
            path = %file_path.display(),
            skipped_packets,
            "Some packets could not be decoded"
        );
    }

    let decoded = DecodedAudio {
        samples,
        sample_rate,
        channels: channel_count,
    };

    tracing::debug!(
        path = %file_path.display(),
        total_samples = decoded.samples.len(),
        sample_rate = decoded.sample_rate,
        duration_seconds = format!("{:.2}", decoded.duration_seconds()),
        "Audio decoding complete"
    );

    Ok(decoded)
}

fn frame_limit(max_duration: Option<Duration>, sample_rate: u32) -> Option<usize> {
    max_duration.map(|d| (d.as_secs_f64() * sample_rate as f64) as usize)
}
