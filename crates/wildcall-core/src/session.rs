//! Per-session analysis state
//!
//! One `AnalysisSession` per live comparison: a bounded rolling sample
//! buffer, the debounced VAD state machine, and the append-only feature
//! sequence. The MFCC extractor is owned per session so concurrent
//! sessions at different sample rates never share spectral state.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::mfcc::MfccExtractor;
use crate::vad::{SegmentBuilder, VoiceActivityDetector};
use std::time::Instant;

pub struct AnalysisSession {
    id: u32,
    sample_rate: f32,
    max_buffer_samples: usize,

    /// Unprocessed raw samples; drained as whole windows are consumed
    rolling: Vec<f32>,
    window_samples: usize,

    detector: VoiceActivityDetector,
    segments: SegmentBuilder,
    extractor: MfccExtractor,

    /// Append-only for the session lifetime
    features: Vec<Vec<f32>>,

    started_at: Instant,
}

impl AnalysisSession {
    pub fn new(id: u32, sample_rate: f32, config: &EngineConfig) -> Result<Self, EngineError> {
        if sample_rate <= 0.0 || !sample_rate.is_finite() {
            return Err(EngineError::InvalidParameters(format!(
                "sample rate must be > 0, got {sample_rate}"
            )));
        }

        let window_samples = config.vad.window_samples(sample_rate);
        if window_samples == 0 {
            return Err(EngineError::InvalidParameters(
                "VAD window is shorter than one sample at this rate".into(),
            ));
        }

        Ok(Self {
            id,
            sample_rate,
            max_buffer_samples: config.max_buffer_samples,
            rolling: Vec::new(),
            window_samples,
            detector: VoiceActivityDetector::new(&config.vad),
            segments: SegmentBuilder::new(&config.vad, sample_rate),
            extractor: MfccExtractor::new(&config.mfcc, sample_rate)?,
            features: Vec::new(),
            started_at: Instant::now(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn features(&self) -> &[Vec<f32>] {
        &self.features
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Append a raw audio chunk and run the VAD over every complete
    /// window now available. Completed voiced segments are extracted
    /// immediately and their frames appended to the feature sequence.
    pub fn push_audio(&mut self, samples: &[f32]) -> Result<(), EngineError> {
        if self.rolling.len() + samples.len() > self.max_buffer_samples {
            return Err(EngineError::BufferOverflow {
                requested: self.rolling.len() + samples.len(),
                cap: self.max_buffer_samples,
            });
        }

        self.rolling.extend_from_slice(samples);

        let mut pos = 0;
        while pos + self.window_samples <= self.rolling.len() {
            let window = &self.rolling[pos..pos + self.window_samples];
            let decision = self.detector.classify(window);

            if let Some(segment) = self.segments.push_window(window, decision) {
                if !segment.is_empty() {
                    let frames = self.extractor.extract(&segment)?;
                    log::debug!(
                        "Session {}: segment of {} samples yielded {} frames",
                        self.id,
                        segment.len(),
                        frames.len()
                    );
                    self.features.extend(frames);
                }
            }

            pos += self.window_samples;
        }

        // Drop the fully processed prefix; the partial-window tail waits
        // for the next chunk.
        self.rolling.drain(..pos);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn tone(rate: f32, secs: f32) -> Vec<f32> {
        let n = (rate * secs) as usize;
        (0..n)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / rate).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_invalid_sample_rate_rejected() {
        assert!(matches!(
            AnalysisSession::new(1, 0.0, &config()),
            Err(EngineError::InvalidParameters(_))
        ));
        assert!(matches!(
            AnalysisSession::new(1, -44100.0, &config()),
            Err(EngineError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_buffer_overflow_rejects_whole_chunk() {
        let cfg = EngineConfig {
            max_buffer_samples: 1000,
            ..config()
        };
        let mut session = AnalysisSession::new(1, 44100.0, &cfg).unwrap();

        // 600 samples is under one 20 ms window at 44.1 kHz, so nothing
        // drains; the second chunk would exceed the cap.
        session.push_audio(&vec![0.0; 600]).unwrap();
        assert!(matches!(
            session.push_audio(&vec![0.0; 600]),
            Err(EngineError::BufferOverflow { .. })
        ));
    }

    #[test]
    fn test_voiced_audio_produces_features() {
        let mut session = AnalysisSession::new(1, 44100.0, &config()).unwrap();

        session.push_audio(&tone(44100.0, 1.0)).unwrap();
        // Still inside the voiced segment: nothing extracted yet.
        assert_eq!(session.feature_count(), 0);

        // Silence closes the segment and triggers extraction.
        session.push_audio(&vec![0.0; 22050]).unwrap();
        assert!(session.feature_count() > 0);
    }

    #[test]
    fn test_silence_only_produces_no_features() {
        let mut session = AnalysisSession::new(1, 44100.0, &config()).unwrap();
        session.push_audio(&vec![0.0; 44100]).unwrap();
        assert_eq!(session.feature_count(), 0);
    }

    #[test]
    fn test_features_accumulate_across_segments() {
        let mut session = AnalysisSession::new(1, 44100.0, &config()).unwrap();

        session.push_audio(&tone(44100.0, 0.5)).unwrap();
        session.push_audio(&vec![0.0; 22050]).unwrap();
        let after_first = session.feature_count();
        assert!(after_first > 0);

        session.push_audio(&tone(44100.0, 0.5)).unwrap();
        session.push_audio(&vec![0.0; 22050]).unwrap();
        assert!(session.feature_count() > after_first);
    }
}
