//! Typed errors for the public engine surface
//!
//! Every public engine operation returns one of these kinds; nothing
//! panics across the crate boundary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed caller input (non-positive sample rate, bad config, ...)
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Unknown analysis session id
    #[error("unknown session id {0}")]
    InvalidSession(u32),

    /// Unknown recording id
    #[error("unknown recording id {0}")]
    InvalidRecordingId(u32),

    /// Rolling buffer cap would be exceeded; the chunk is not applied
    #[error("audio buffer overflow: {requested} samples would exceed cap of {cap}")]
    BufferOverflow { requested: usize, cap: usize },

    /// Waveform or cache source file missing
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Failed to write a recording or cache file
    #[error("failed to write {}: {reason}", .path.display())]
    FileWriteError { path: PathBuf, reason: String },

    /// Audio processing failed with no fallback
    #[error("processing error: {0}")]
    ProcessingError(String),

    /// Comparison attempted with an empty sequence on either side
    #[error("insufficient data for comparison")]
    InsufficientData,
}
