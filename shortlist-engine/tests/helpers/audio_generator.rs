//! Audio Test Fixture Generator
//!
//! Writes WAV files with a steady tone and an optional click pulse, so tests
//! know the expected key and tempo.

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Tone frequency in Hz
    pub tone_hz: f64,
    /// Click pulse tempo; `None` for a bare tone
    pub click_bpm: Option<f64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 8.0,
            sample_rate: 22_050,
            channels: 2,
            tone_hz: 440.0,
            click_bpm: Some(120.0),
        }
    }
}

/// Generate a 16-bit WAV file
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;
    let click_interval = config
        .click_bpm
        .map(|bpm| (60.0 / bpm * config.sample_rate as f64) as usize);

    for i in 0..total_samples {
        let t = i as f64 / config.sample_rate as f64;
        let mut value = 0.4 * (2.0 * std::f64::consts::PI * config.tone_hz * t).sin();

        if let Some(interval) = click_interval {
            if i % interval < 8 {
                value += 0.5;
            }
        }

        let sample = (value.clamp(-1.0, 1.0) * i16::MAX as f64) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}
