//! .mfc file format structures
//!
//! An .mfc file stores one feature-vector sequence for a reference call:
//! an 8-byte header followed by `frame_count * coeff_width` little-endian
//! f32 values, frame-major.

/// Header size in bytes: two u32 fields
pub const HEADER_SIZE: u64 = 8;

/// Upper bound on a plausible coefficient width. A header declaring
/// more than this is treated as corrupt.
pub const MAX_COEFF_WIDTH: u32 = 64;

/// File header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcHeader {
    /// Number of feature frames
    pub frame_count: u32,
    /// Coefficients per frame
    pub coeff_width: u32,
}

impl FcHeader {
    pub fn new(frame_count: u32, coeff_width: u32) -> Self {
        Self {
            frame_count,
            coeff_width,
        }
    }

    /// Total file size implied by this header
    pub fn expected_file_size(&self) -> u64 {
        HEADER_SIZE + self.frame_count as u64 * self.coeff_width as u64 * 4
    }
}
