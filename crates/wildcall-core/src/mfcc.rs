//! MFCC feature extraction
//!
//! Overlapping Hamming-windowed frames -> FFT power spectrum -> triangular
//! mel filterbank -> log compression -> orthonormal DCT-II, yielding one
//! fixed-width coefficient vector per frame. The extractor is built for a
//! single sample rate; a rate change means constructing a new extractor
//! and invalidating features computed under the old one.

use crate::error::EngineError;
use anyhow::Result;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::Arc;

/// Rate-independent extractor parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MfccSettings {
    pub frame_size: usize,
    /// Defaults to frame_size / 2
    pub hop_size: usize,
    /// Coefficient width; fixed per cache generation
    pub num_coeffs: usize,
    pub num_filters: usize,
    /// Lower edge of the filterbank (Hz)
    pub low_freq: f32,
    /// Upper edge of the filterbank (Hz); 0 means sample_rate / 2
    pub high_freq: f32,
}

impl Default for MfccSettings {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 1024,
            num_coeffs: 13,
            num_filters: 26,
            low_freq: 0.0,
            high_freq: 0.0,
        }
    }
}

impl MfccSettings {
    pub fn validate(&self) -> Result<()> {
        if self.frame_size == 0 {
            anyhow::bail!("frame_size must be > 0");
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            anyhow::bail!("hop_size must be in 1..=frame_size");
        }
        if self.num_coeffs == 0 || self.num_coeffs > self.num_filters {
            anyhow::bail!("num_coeffs must be in 1..=num_filters");
        }
        if self.low_freq < 0.0 {
            anyhow::bail!("low_freq must be >= 0");
        }
        Ok(())
    }
}

/// Mel scale conversion
fn freq_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

fn mel_to_freq(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// MFCC extractor bound to one sample rate
pub struct MfccExtractor {
    settings: MfccSettings,
    sample_rate: f32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// num_filters x num_bins, row-major
    filterbank: Vec<f32>,
    /// num_coeffs x num_filters, row-major
    dct: Vec<f32>,
    num_bins: usize,
}

impl MfccExtractor {
    pub fn new(settings: &MfccSettings, sample_rate: f32) -> Result<Self, EngineError> {
        settings
            .validate()
            .map_err(|e| EngineError::InvalidParameters(e.to_string()))?;
        if sample_rate <= 0.0 || !sample_rate.is_finite() {
            return Err(EngineError::InvalidParameters(format!(
                "sample rate must be > 0, got {sample_rate}"
            )));
        }

        let frame_size = settings.frame_size;
        let num_bins = frame_size / 2 + 1;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);

        // Hamming window
        let window: Vec<f32> = (0..frame_size)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / (frame_size - 1) as f32).cos())
            .collect();

        let high_freq = if settings.high_freq > 0.0 {
            settings.high_freq
        } else {
            sample_rate / 2.0
        };
        let filterbank =
            build_filterbank(settings, sample_rate, settings.low_freq, high_freq, num_bins);
        let dct = build_dct_matrix(settings.num_coeffs, settings.num_filters);

        Ok(Self {
            settings: settings.clone(),
            sample_rate,
            fft,
            window,
            filterbank,
            dct,
            num_bins,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn settings(&self) -> &MfccSettings {
        &self.settings
    }

    /// Extract the full feature sequence from a contiguous buffer.
    ///
    /// Deterministic for identical input. An empty buffer is a processing
    /// error; a buffer shorter than one frame yields zero vectors, which
    /// is valid.
    pub fn extract(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>, EngineError> {
        if samples.is_empty() {
            return Err(EngineError::ProcessingError(
                "cannot extract features from empty audio".into(),
            ));
        }

        let frame_size = self.settings.frame_size;
        let hop = self.settings.hop_size;

        let num_frames = if samples.len() >= frame_size {
            (samples.len() - frame_size) / hop + 1
        } else {
            0
        };

        let mut frames = Vec::with_capacity(num_frames);
        for i in 0..num_frames {
            let offset = i * hop;
            frames.push(self.process_frame(&samples[offset..offset + frame_size]));
        }

        Ok(frames)
    }

    fn process_frame(&self, frame: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = frame
            .iter()
            .zip(&self.window)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        self.fft.process(&mut buffer);

        let power: Vec<f32> = buffer[..self.num_bins]
            .iter()
            .map(|c| c.re * c.re + c.im * c.im)
            .collect();

        let num_filters = self.settings.num_filters;
        let mut mel_energies = vec![0.0f32; num_filters];
        for (f, energy) in mel_energies.iter_mut().enumerate() {
            let row = &self.filterbank[f * self.num_bins..(f + 1) * self.num_bins];
            let sum: f32 = row.iter().zip(&power).map(|(&w, &p)| w * p).sum();
            *energy = (sum + 1e-10).ln();
        }

        let mut coeffs = vec![0.0f32; self.settings.num_coeffs];
        for (c, coeff) in coeffs.iter_mut().enumerate() {
            let row = &self.dct[c * num_filters..(c + 1) * num_filters];
            *coeff = row.iter().zip(&mel_energies).map(|(&d, &m)| d * m).sum();
        }

        coeffs
    }
}

/// Triangular mel filterbank as a dense num_filters x num_bins matrix
fn build_filterbank(
    settings: &MfccSettings,
    sample_rate: f32,
    low_freq: f32,
    high_freq: f32,
    num_bins: usize,
) -> Vec<f32> {
    let num_filters = settings.num_filters;
    let frame_size = settings.frame_size;

    let mel_low = freq_to_mel(low_freq);
    let mel_high = freq_to_mel(high_freq);
    let mel_step = (mel_high - mel_low) / (num_filters + 1) as f32;

    // Edge bin indices for each filter's rise and fall.
    let bin_points: Vec<usize> = (0..num_filters + 2)
        .map(|i| {
            let freq = mel_to_freq(mel_low + i as f32 * mel_step);
            ((freq * frame_size as f32 / sample_rate) as usize).min(num_bins - 1)
        })
        .collect();

    let mut filterbank = vec![0.0f32; num_filters * num_bins];
    for f in 0..num_filters {
        let (left, center, right) = (bin_points[f], bin_points[f + 1], bin_points[f + 2]);

        if center > left {
            for bin in left..center {
                filterbank[f * num_bins + bin] = (bin - left) as f32 / (center - left) as f32;
            }
        }
        if right > center {
            for bin in center..right {
                filterbank[f * num_bins + bin] = (right - bin) as f32 / (right - center) as f32;
            }
        }
    }

    filterbank
}

/// Orthonormal DCT-II matrix, num_coeffs x num_filters
fn build_dct_matrix(num_coeffs: usize, num_filters: usize) -> Vec<f32> {
    let m = num_filters as f32;
    let scale = (2.0 / m).sqrt();
    let scale0 = (1.0 / m).sqrt();

    let mut dct = vec![0.0f32; num_coeffs * num_filters];
    for i in 0..num_coeffs {
        for j in 0..num_filters {
            let val = (PI * i as f32 * (j as f32 + 0.5) / m).cos();
            dct[i * num_filters + j] = if i == 0 { val * scale0 } else { val * scale };
        }
    }
    dct
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, rate: f32, secs: f32) -> Vec<f32> {
        let n = (rate * secs) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / rate).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_extract_is_deterministic() {
        let extractor = MfccExtractor::new(&MfccSettings::default(), 44100.0).unwrap();
        let samples = tone(440.0, 44100.0, 0.5);

        let a = extractor.extract(&samples).unwrap();
        let b = extractor.extract(&samples).unwrap();
        assert_eq!(a, b);

        // A second extractor with identical parameters agrees too.
        let other = MfccExtractor::new(&MfccSettings::default(), 44100.0).unwrap();
        assert_eq!(other.extract(&samples).unwrap(), a);
    }

    #[test]
    fn test_empty_input_is_processing_error() {
        let extractor = MfccExtractor::new(&MfccSettings::default(), 44100.0).unwrap();
        assert!(matches!(
            extractor.extract(&[]),
            Err(EngineError::ProcessingError(_))
        ));
    }

    #[test]
    fn test_sub_frame_input_yields_zero_frames() {
        let extractor = MfccExtractor::new(&MfccSettings::default(), 44100.0).unwrap();
        let frames = extractor.extract(&vec![0.1f32; 1024]).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn test_frame_count_and_width() {
        let settings = MfccSettings::default();
        let extractor = MfccExtractor::new(&settings, 44100.0).unwrap();

        let samples = tone(440.0, 44100.0, 1.0);
        let frames = extractor.extract(&samples).unwrap();

        let expected = (samples.len() - settings.frame_size) / settings.hop_size + 1;
        assert_eq!(frames.len(), expected);
        assert!(frames.iter().all(|f| f.len() == settings.num_coeffs));
    }

    #[test]
    fn test_coefficients_are_finite() {
        let extractor = MfccExtractor::new(&MfccSettings::default(), 44100.0).unwrap();
        let frames = extractor.extract(&tone(880.0, 44100.0, 0.25)).unwrap();
        assert!(!frames.is_empty());
        assert!(frames.iter().flatten().all(|c| c.is_finite()));

        // Silence is also representable: log compression floors at ln(1e-10).
        let frames = extractor.extract(&vec![0.0f32; 4096]).unwrap();
        assert!(frames.iter().flatten().all(|c| c.is_finite()));
    }

    #[test]
    fn test_different_tones_differ() {
        let extractor = MfccExtractor::new(&MfccSettings::default(), 44100.0).unwrap();
        let low = extractor.extract(&tone(220.0, 44100.0, 0.5)).unwrap();
        let high = extractor.extract(&tone(3520.0, 44100.0, 0.5)).unwrap();
        assert_ne!(low, high);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = MfccSettings {
            hop_size: 0,
            ..Default::default()
        };
        assert!(MfccExtractor::new(&settings, 44100.0).is_err());
        assert!(MfccExtractor::new(&MfccSettings::default(), 0.0).is_err());
        assert!(MfccExtractor::new(&MfccSettings::default(), -44100.0).is_err());
    }
}
