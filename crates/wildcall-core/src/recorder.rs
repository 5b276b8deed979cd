//! Raw-capture recording sessions
//!
//! Decoupled from analysis sessions: a recording just accumulates mono
//! samples pushed through the capture boundary until it is saved or
//! discarded. Device I/O itself lives outside the engine.

use crate::error::EngineError;
use std::time::Instant;

/// Window used for the live level meter
const LEVEL_WINDOW_SAMPLES: usize = 2048;

pub struct RecordingSession {
    id: u32,
    sample_rate: f32,
    samples: Vec<f32>,
    max_samples: usize,
    active: bool,
    started_at: Instant,
}

impl RecordingSession {
    pub fn new(id: u32, sample_rate: f32, max_samples: usize) -> Result<Self, EngineError> {
        if sample_rate <= 0.0 || !sample_rate.is_finite() {
            return Err(EngineError::InvalidParameters(format!(
                "sample rate must be > 0, got {sample_rate}"
            )));
        }

        Ok(Self {
            id,
            sample_rate,
            samples: Vec::new(),
            max_samples,
            active: true,
            started_at: Instant::now(),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Append captured samples. Ignored with a warning once stopped.
    pub fn push_samples(&mut self, samples: &[f32]) -> Result<(), EngineError> {
        if !self.active {
            log::warn!("Recording {}: samples pushed after stop, ignoring", self.id);
            return Ok(());
        }

        if self.samples.len() + samples.len() > self.max_samples {
            return Err(EngineError::BufferOverflow {
                requested: self.samples.len() + samples.len(),
                cap: self.max_samples,
            });
        }

        self.samples.extend_from_slice(samples);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Captured duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Peak absolute amplitude over the most recent level window
    pub fn level(&self) -> f32 {
        let start = self.samples.len().saturating_sub(LEVEL_WINDOW_SAMPLES);
        self.samples[start..]
            .iter()
            .fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }
}

/// Strip path separators and force a .wav extension
pub fn sanitize_recording_filename(filename: &str) -> String {
    let mut safe: String = filename
        .chars()
        .filter(|&c| c != '/' && c != '\\')
        .collect();

    if !safe.to_ascii_lowercase().ends_with(".wav") {
        safe.push_str(".wav");
    }
    safe
}
