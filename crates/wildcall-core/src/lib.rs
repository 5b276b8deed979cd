//! Wildcall Core - Wildlife Call Analysis Engine
//!
//! Real-time analysis of wildlife-call audio: voiced segments are
//! detected in a live sample stream, reduced to MFCC feature sequences,
//! and scored against a reference call profile by dynamic time warping.

pub mod audio;
pub mod config;
pub mod dtw;
pub mod engine;
pub mod error;
pub mod mfcc;
pub mod recorder;
pub mod session;
pub mod vad;

pub use config::EngineConfig;
pub use dtw::{similarity_from_distance, Comparator, DtwComparator};
pub use engine::{CallEngine, RecordingId, ReferenceProfile, SessionId};
pub use error::EngineError;
pub use mfcc::{MfccExtractor, MfccSettings};
pub use vad::{SegmentBuilder, VadConfig, VoiceActivityDetector};

use std::path::Path;

/// Compute the feature sequence for a call waveform on disk.
///
/// Decodes the WAV, mixes down to mono, and extracts MFCC frames at the
/// file's native rate. Returns the frames and that rate.
pub fn compute_call_features(
    path: &Path,
    settings: &MfccSettings,
) -> Result<(Vec<Vec<f32>>, f32), EngineError> {
    if !path.exists() {
        return Err(EngineError::FileNotFound(path.to_path_buf()));
    }

    let audio_data =
        audio::decode_wav(path).map_err(|e| EngineError::ProcessingError(e.to_string()))?;
    let sample_rate = audio_data.sample_rate as f32;
    let mono = audio_data.to_mono();

    let extractor = MfccExtractor::new(settings, sample_rate)?;
    let features = extractor.extract(&mono)?;

    Ok((features, sample_rate))
}
