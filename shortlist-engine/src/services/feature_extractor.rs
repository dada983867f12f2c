//! Feature extraction: audio file → [`FeatureVector`]
//!
//! The profile builder and the shortlist controller only see the
//! [`FeatureExtractor`] trait. [`SpectralFeatureExtractor`] is the shipped
//! implementation, computing every feature from one short-time Fourier
//! transform of the first 90 seconds of audio.

use crate::models::{FeatureVector, InvalidFeature, PitchClass};
use crate::utils::{decode_audio_file, AudioDecodeError};
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// File extensions accepted as audio (lowercase, without the dot)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "aiff", "aif", "flac"];

/// Portion of each file that is analyzed
pub const ANALYSIS_WINDOW: Duration = Duration::from_secs(90);

const FRAME_SIZE: usize = 2048;
const HOP_SIZE: usize = 512;

/// Low-frequency band for the bass feature (Hz)
const BASS_RANGE: (f64, f64) = (20.0, 150.0);
/// Band accumulated into the chroma vector (Hz)
const CHROMA_RANGE: (f64, f64) = (65.0, 2100.0);
/// Tempo search range (BPM)
const MIN_BPM: f64 = 70.0;
const MAX_BPM: f64 = 180.0;
/// Dynamic range kept in the dB spectrum before computing onset flux
const TOP_DB: f64 = 80.0;

/// Feature extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio decode error: {0}")]
    AudioDecode(String),

    #[error("No audio samples decoded")]
    NoAudio,

    #[error("Degenerate features: {0}")]
    Degenerate(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AudioDecodeError> for ExtractionError {
    fn from(err: AudioDecodeError) -> Self {
        match err {
            AudioDecodeError::Open(e) => ExtractionError::Io(e),
            AudioDecodeError::Format(msg) => ExtractionError::AudioDecode(msg),
            AudioDecodeError::NoTrack => ExtractionError::NoAudio,
        }
    }
}

impl From<InvalidFeature> for ExtractionError {
    fn from(err: InvalidFeature) -> Self {
        ExtractionError::Degenerate(err.to_string())
    }
}

/// Maps an audio file to a feature vector
///
/// Implementations are called from blocking worker threads and must not
/// keep per-call state.
pub trait FeatureExtractor: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn extract(&self, path: &Path) -> Result<FeatureVector, ExtractionError>;
}

/// STFT-based extractor
///
/// **Features** (Hann window 2048, hop 512):
/// - `brightness`: mean spectral centroid in Hz
/// - `bass`: mean magnitude of bins within 20-150 Hz
/// - `rhythm`: mean onset strength (rectified dB flux, 80 dB floor)
/// - `bpm`: strongest onset-envelope autocorrelation lag within 70-180 BPM
/// - `key`: argmax of a 12-bin chroma over 65-2100 Hz
#[derive(Debug, Clone)]
pub struct SpectralFeatureExtractor {
    max_duration: Duration,
}

impl Default for SpectralFeatureExtractor {
    fn default() -> Self {
        Self {
            max_duration: ANALYSIS_WINDOW,
        }
    }
}

impl SpectralFeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_duration(max_duration: Duration) -> Self {
        Self { max_duration }
    }

    /// Compute features from mono samples
    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<FeatureVector, ExtractionError> {
        if sample_rate == 0 || samples.is_empty() {
            return Err(ExtractionError::NoAudio);
        }
        if samples.len() < FRAME_SIZE {
            return Err(ExtractionError::Degenerate(format!(
                "{} samples is shorter than one analysis frame",
                samples.len()
            )));
        }

        let bin_count = FRAME_SIZE / 2 + 1;
        let bin_hz = sample_rate as f64 / FRAME_SIZE as f64;
        let frequencies: Vec<f64> = (0..bin_count).map(|k| k as f64 * bin_hz).collect();

        let bass_bins: Vec<usize> = bins_within(&frequencies, BASS_RANGE).collect();
        let chroma_bins: Vec<(usize, usize)> = bins_within(&frequencies, CHROMA_RANGE)
            .map(|k| (k, pitch_class_index(frequencies[k])))
            .collect();

        let starts: Vec<usize> = (0..=samples.len() - FRAME_SIZE).step_by(HOP_SIZE).collect();
        let frame_count = starts.len() as f64;

        let mut stft = Stft::new(FRAME_SIZE);
        let mut magnitudes = vec![0.0f64; bin_count];

        // Pass 1: spectral shape, chroma, global peak
        let mut centroid_sum = 0.0;
        let mut bass_sum = 0.0;
        let mut chroma = [0.0f64; 12];
        let mut peak = 0.0f64;

        for &start in &starts {
            stft.magnitudes(&samples[start..start + FRAME_SIZE], &mut magnitudes)?;

            let total: f64 = magnitudes.iter().sum();
            if total > 0.0 {
                let weighted: f64 = magnitudes
                    .iter()
                    .zip(&frequencies)
                    .map(|(m, f)| m * f)
                    .sum();
                centroid_sum += weighted / total;
            }

            if !bass_bins.is_empty() {
                bass_sum += bass_bins.iter().map(|&k| magnitudes[k]).sum::<f64>()
                    / bass_bins.len() as f64;
            }

            for &(k, pitch) in &chroma_bins {
                chroma[pitch] += magnitudes[k] * magnitudes[k];
            }

            peak = magnitudes.iter().copied().fold(peak, f64::max);
        }

        // Pass 2: onset envelope from the floored dB spectrum
        let floor_db = amplitude_db(peak) - TOP_DB;
        let mut previous_db = vec![0.0f64; bin_count];
        let mut current_db = vec![0.0f64; bin_count];
        let mut envelope = Vec::with_capacity(starts.len());

        for (index, &start) in starts.iter().enumerate() {
            stft.magnitudes(&samples[start..start + FRAME_SIZE], &mut magnitudes)?;
            for (db, &m) in current_db.iter_mut().zip(&magnitudes) {
                *db = amplitude_db(m).max(floor_db);
            }

            let flux = if index == 0 {
                0.0
            } else {
                current_db
                    .iter()
                    .zip(&previous_db)
                    .map(|(now, before)| (now - before).max(0.0))
                    .sum::<f64>()
                    / bin_count as f64
            };
            envelope.push(flux);
            std::mem::swap(&mut previous_db, &mut current_db);
        }

        let rhythm = if envelope.len() > 1 {
            envelope[1..].iter().sum::<f64>() / (envelope.len() - 1) as f64
        } else {
            0.0
        };

        let frame_rate = sample_rate as f64 / HOP_SIZE as f64;
        let bpm = estimate_tempo(&envelope, frame_rate)
            .ok_or_else(|| ExtractionError::Degenerate("no periodic onsets".to_string()))?;

        let key = PitchClass::from_index(argmax(&chroma));

        Ok(FeatureVector::new(
            bpm,
            rhythm,
            key,
            centroid_sum / frame_count,
            bass_sum / frame_count,
        )?)
    }
}

impl FeatureExtractor for SpectralFeatureExtractor {
    fn name(&self) -> &'static str {
        "spectral"
    }

    fn extract(&self, path: &Path) -> Result<FeatureVector, ExtractionError> {
        let audio = decode_audio_file(path, Some(self.max_duration))?;
        let features = self.analyze(&audio.samples, audio.sample_rate)?;

        tracing::debug!(
            path = %path.display(),
            bpm = format!("{:.1}", features.bpm()),
            key = %features.key(),
            brightness = format!("{:.0}", features.brightness()),
            "Extracted features"
        );

        Ok(features)
    }
}

/// Windowed real FFT with reusable buffers
struct Stft {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    scale: f64,
}

impl Stft {
    fn new(size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let window = hann_window(size);
        let window_sum: f64 = window.iter().map(|&w| w as f64).sum();

        Self {
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
            window,
            scale: if window_sum > 0.0 { 1.0 / window_sum } else { 1.0 },
        }
    }

    fn magnitudes(&mut self, frame: &[f32], out: &mut [f64]) -> Result<(), ExtractionError> {
        for ((dst, &sample), &w) in self.input.iter_mut().zip(frame).zip(&self.window) {
            *dst = sample * w;
        }
        self.fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| ExtractionError::Internal(e.to_string()))?;

        for (m, c) in out.iter_mut().zip(&self.spectrum) {
            *m = c.norm() as f64 * self.scale;
        }
        Ok(())
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / size as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

fn bins_within(frequencies: &[f64], (low, high): (f64, f64)) -> impl Iterator<Item = usize> + '_ {
    frequencies
        .iter()
        .enumerate()
        .filter(move |(_, f)| **f >= low && **f <= high)
        .map(|(k, _)| k)
}

/// Pitch class of a frequency, C = 0 (A4 = 440 Hz)
fn pitch_class_index(frequency: f64) -> usize {
    let midi = 69.0 + 12.0 * (frequency / 440.0).log2();
    (midi.round() as i64).rem_euclid(12) as usize
}

fn amplitude_db(magnitude: f64) -> f64 {
    20.0 * magnitude.max(1e-10).log10()
}

// First index wins on ties
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate().skip(1) {
        if value > values[best] {
            best = index;
        }
    }
    best
}

/// Tempo from the onset envelope's autocorrelation
///
/// Searches lags corresponding to 70-180 BPM and refines the best lag with a
/// parabolic fit. `None` when no lag has positive correlation.
fn estimate_tempo(envelope: &[f64], frame_rate: f64) -> Option<f64> {
    if envelope.is_empty() || frame_rate <= 0.0 {
        return None;
    }

    let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|v| v - mean).collect();

    let min_lag = ((60.0 * frame_rate / MAX_BPM).ceil() as usize).max(1);
    let max_lag = ((60.0 * frame_rate / MIN_BPM).floor() as usize).min(centered.len().saturating_sub(2));
    if min_lag > max_lag {
        return None;
    }

    let acf = |lag: usize| -> f64 {
        centered
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum()
    };

    let mut best: Option<(usize, f64)> = None;
    for lag in min_lag..=max_lag {
        let r = acf(lag);
        if r > 0.0 && best.map_or(true, |(_, top)| r > top) {
            best = Some((lag, r));
        }
    }
    let (lag, top) = best?;

    let mut refined = lag as f64;
    if lag > min_lag && lag < max_lag {
        let before = acf(lag - 1);
        let after = acf(lag + 1);
        let curvature = before - 2.0 * top + after;
        if curvature < 0.0 {
            refined += 0.5 * (before - after) / curvature;
        }
    }

    Some(60.0 * frame_rate / refined)
}
