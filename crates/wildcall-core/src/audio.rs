//! Waveform file boundary
//!
//! WAV decode for reference calls and WAV encode for saved recordings.
//! Anything fancier than a waveform reader (codecs, resampling, capture
//! devices) lives outside the engine.

use anyhow::{Context, Result};
use std::path::Path;

/// Decoded audio data
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples in [-1, 1]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioData {
    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let channels = self.channels as usize;
        let mut mono = Vec::with_capacity(self.samples.len() / channels);
        for frame in self.samples.chunks(channels) {
            let avg: f32 = frame.iter().sum::<f32>() / frame.len() as f32;
            mono.push(avg);
        }
        mono
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Decode a WAV file
pub fn decode_wav(path: &Path) -> Result<AudioData> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    log::debug!(
        "Decoded {}: {} ch @ {} Hz, {} samples",
        path.display(),
        spec.channels,
        spec.sample_rate,
        samples.len()
    );

    Ok(AudioData {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Read only the sample rate from a WAV header
pub fn wav_sample_rate(path: &Path) -> Result<u32> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    Ok(reader.spec().sample_rate)
}

/// Write mono f32 samples as a 32-bit float WAV file
pub fn encode_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    for &sample in samples {
        writer.write_sample(sample)?;
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_to_mono_averages_channels() {
        let audio = AudioData {
            samples: vec![0.2, 0.4, -0.6, 0.6, 1.0, 0.0],
            sample_rate: 44100,
            channels: 2,
        };

        let mono = audio.to_mono();
        assert_eq!(mono.len(), 3);
        assert_abs_diff_eq!(mono[0], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(mono[1], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(mono[2], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_to_mono_passthrough_for_mono() {
        let audio = AudioData {
            samples: vec![0.1, 0.2, 0.3],
            sample_rate: 44100,
            channels: 1,
        };
        assert_eq!(audio.to_mono(), audio.samples);
    }

    #[test]
    fn test_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let samples: Vec<f32> = (0..4410)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        encode_wav(&path, &samples, 44100).unwrap();

        let decoded = decode_wav(&path).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples, samples);
        assert_eq!(wav_sample_rate(&path).unwrap(), 44100);
    }
}
