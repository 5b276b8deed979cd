//! JSON output formatting

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One scored comparison of an input waveform against a reference call
#[derive(Debug, Serialize)]
pub struct ScoreOutput {
    pub input_path: String,
    pub reference_id: String,
    /// Sample rate the session ran at (Hz)
    pub sample_rate: f32,
    /// Feature frames extracted from the input's voiced segments
    pub session_frames: usize,
    /// Similarity in (0, 1]; 1.0 is a perfect match
    pub score: f32,
    pub analyzed_at: DateTime<Utc>,
}

/// Print a score result as JSON
pub fn print_json(output: &ScoreOutput) {
    match serde_json::to_string_pretty(output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_output_serializes() {
        let out = ScoreOutput {
            input_path: "attempt.wav".into(),
            reference_id: "buck_grunt".into(),
            sample_rate: 44100.0,
            session_frames: 80,
            score: 0.93,
            analyzed_at: Utc::now(),
        };

        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"reference_id\":\"buck_grunt\""));
        assert!(json.contains("\"session_frames\":80"));
    }
}
