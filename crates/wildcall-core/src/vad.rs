//! Voice activity detection
//!
//! Per-window classification (energy + peak thresholds) plus the
//! debounced segment state machine driven by the session layer. All
//! hysteresis counters are kept in samples, derived from the session
//! sample rate, so window size changes do not skew the durations.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// VAD tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Mean-squared-amplitude threshold for an active window
    pub energy_threshold: f32,
    /// Absolute peak threshold for an active window
    pub silence_threshold: f32,
    /// Classification window length
    pub window_duration_ms: f32,
    /// Continuous activity required to open a segment
    pub min_sound_ms: f32,
    /// Continuous inactivity required to close a segment
    pub min_silence_ms: f32,
    /// Trailing quiet audio kept attached to a segment
    pub hangover_ms: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.01,
            silence_threshold: 0.02,
            window_duration_ms: 20.0,
            min_sound_ms: 100.0,
            min_silence_ms: 50.0,
            hangover_ms: 100.0,
        }
    }
}

impl VadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.energy_threshold < 0.0 || self.silence_threshold < 0.0 {
            anyhow::bail!("VAD thresholds must be >= 0");
        }
        if self.window_duration_ms <= 0.0 {
            anyhow::bail!("VAD window duration must be > 0");
        }
        if self.min_sound_ms < 0.0 || self.min_silence_ms < 0.0 || self.hangover_ms < 0.0 {
            anyhow::bail!("VAD durations must be >= 0");
        }
        Ok(())
    }

    /// Window length in samples at the given rate
    pub fn window_samples(&self, sample_rate: f32) -> usize {
        (self.window_duration_ms * sample_rate / 1000.0) as usize
    }
}

/// Per-window classification result
#[derive(Debug, Clone, Copy)]
pub struct WindowDecision {
    pub is_active: bool,
    pub energy: f32,
    pub peak: f32,
}

/// Stateless window classifier
#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    energy_threshold: f32,
    silence_threshold: f32,
}

impl VoiceActivityDetector {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            energy_threshold: config.energy_threshold,
            silence_threshold: config.silence_threshold,
        }
    }

    /// Classify one fixed-size window of raw samples
    pub fn classify(&self, window: &[f32]) -> WindowDecision {
        let energy = compute_energy(window);
        let peak = window.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));

        WindowDecision {
            is_active: energy > self.energy_threshold || peak > self.silence_threshold,
            energy,
            peak,
        }
    }
}

/// Mean squared amplitude of a window
pub fn compute_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32
}

/// Debounced Silence/Sound state machine with a pending segment buffer.
///
/// Fed one classified window at a time; yields the accumulated segment
/// when the Sound -> Silence transition fires.
#[derive(Debug)]
pub struct SegmentBuilder {
    min_sound_samples: usize,
    min_silence_samples: usize,
    hangover_samples: usize,

    in_sound: bool,
    sound_run: usize,
    silence_run: usize,
    pending: Vec<f32>,
}

impl SegmentBuilder {
    pub fn new(config: &VadConfig, sample_rate: f32) -> Self {
        Self {
            min_sound_samples: (config.min_sound_ms * sample_rate / 1000.0) as usize,
            min_silence_samples: (config.min_silence_ms * sample_rate / 1000.0) as usize,
            hangover_samples: (config.hangover_ms * sample_rate / 1000.0) as usize,
            in_sound: false,
            sound_run: 0,
            silence_run: 0,
            pending: Vec::new(),
        }
    }

    pub fn in_sound(&self) -> bool {
        self.in_sound
    }

    /// Advance the state machine by one window.
    ///
    /// Returns the completed segment when the transition out of Sound
    /// fires; hangover windows after the close start the next pending
    /// buffer so trailing audio is never clipped.
    pub fn push_window(&mut self, window: &[f32], decision: WindowDecision) -> Option<Vec<f32>> {
        let mut completed = None;

        if decision.is_active {
            self.sound_run += window.len();
            self.silence_run = 0;

            if !self.in_sound && self.sound_run >= self.min_sound_samples {
                self.in_sound = true;
                log::debug!("VAD: sound onset (energy {:.5})", decision.energy);
            }
        } else {
            self.silence_run += window.len();
            self.sound_run = 0;

            if self.in_sound && self.silence_run >= self.min_silence_samples {
                self.in_sound = false;
                log::debug!(
                    "VAD: segment closed ({} samples)",
                    self.pending.len()
                );
                completed = Some(std::mem::take(&mut self.pending));
            }
        }

        if self.in_sound || (self.silence_run > 0 && self.silence_run <= self.hangover_samples) {
            self.pending.extend_from_slice(window);
        }

        completed
    }
}
