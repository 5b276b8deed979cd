//! .mfc file reader

use crate::format::{FcHeader, MAX_COEFF_WIDTH};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub struct FcReader;

impl FcReader {
    /// Read an .mfc file, returning the full feature sequence.
    ///
    /// Validation is all-or-nothing: a short or inconsistent file is
    /// rejected wholesale so callers can treat any error as a cache miss.
    pub fn read(path: &Path) -> Result<Vec<Vec<f32>>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open .mfc file: {}", path.display()))?;

        let file_size = file
            .metadata()
            .with_context(|| format!("Failed to stat .mfc file: {}", path.display()))?
            .len();

        let mut reader = BufReader::new(file);

        let header = Self::read_header(&mut reader)?;

        if header.frame_count > 0 && (header.coeff_width == 0 || header.coeff_width > MAX_COEFF_WIDTH)
        {
            anyhow::bail!(
                "Invalid .mfc header: coefficient width {} out of range",
                header.coeff_width
            );
        }

        // Declared counts must fit inside the actual file before any
        // of the body is trusted.
        if file_size < header.expected_file_size() {
            anyhow::bail!(
                "Truncated .mfc file: {} bytes, header declares {}",
                file_size,
                header.expected_file_size()
            );
        }

        let width = header.coeff_width as usize;
        let mut frames = Vec::with_capacity(header.frame_count as usize);
        let mut row = vec![0u8; width * 4];

        for _ in 0..header.frame_count {
            reader.read_exact(&mut row)?;
            let coeffs: Vec<f32> = row
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            frames.push(coeffs);
        }

        log::debug!(
            "Read {} feature frames ({} coefficients each) from {}",
            frames.len(),
            width,
            path.display()
        );

        Ok(frames)
    }

    fn read_header(reader: &mut BufReader<File>) -> Result<FcHeader> {
        let frame_count = Self::read_u32(reader)?;
        let coeff_width = Self::read_u32(reader)?;
        Ok(FcHeader::new(frame_count, coeff_width))
    }

    fn read_u32(reader: &mut BufReader<File>) -> Result<u32> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FcWriter;
    use std::io::Write;

    fn sample_features() -> Vec<Vec<f32>> {
        (0..5)
            .map(|i| (0..13).map(|j| (i * 13 + j) as f32 * 0.25).collect())
            .collect()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buck_grunt.mfc");

        let features = sample_features();
        FcWriter::write(&path, &features).unwrap();

        let loaded = FcReader::read(&path).unwrap();
        assert_eq!(loaded, features);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FcReader::read(&dir.path().join("absent.mfc")).is_err());
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.mfc");

        FcWriter::write(&path, &sample_features()).unwrap();

        // Chop off the last frame's worth of bytes.
        let bytes = std::fs::read(&path).unwrap();
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&bytes[..bytes.len() - 13 * 4]).unwrap();

        assert!(FcReader::read(&path).is_err());
    }

    #[test]
    fn test_zero_width_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("badwidth.mfc");

        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&10u32.to_le_bytes()).unwrap();
        f.write_all(&0u32.to_le_bytes()).unwrap();

        assert!(FcReader::read(&path).is_err());
    }

    #[test]
    fn test_absurd_width_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hugewidth.mfc");

        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&1u32.to_le_bytes()).unwrap();
        f.write_all(&(MAX_COEFF_WIDTH + 1).to_le_bytes()).unwrap();

        assert!(FcReader::read(&path).is_err());
    }

    #[test]
    fn test_header_only_zero_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mfc");

        FcWriter::write(&path, &[]).unwrap();
        // Empty file is structurally valid; deciding whether an empty
        // sequence is usable is the caller's business.
        let loaded = FcReader::read(&path).unwrap();
        assert!(loaded.is_empty());
    }
}
