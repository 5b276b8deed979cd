//! .mfc file writer

use crate::format::{FcHeader, MAX_COEFF_WIDTH};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct FcWriter;

impl FcWriter {
    /// Write a feature sequence as an .mfc file.
    ///
    /// All frames must share one coefficient width; the header is derived
    /// from the first frame.
    pub fn write(path: &Path, features: &[Vec<f32>]) -> Result<()> {
        let width = features.first().map(|f| f.len()).unwrap_or(0);

        if width > MAX_COEFF_WIDTH as usize {
            anyhow::bail!("Coefficient width {} exceeds format limit", width);
        }
        if features.iter().any(|f| f.len() != width) {
            anyhow::bail!("Feature frames have inconsistent coefficient widths");
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create .mfc file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        let header = FcHeader::new(features.len() as u32, width as u32);
        writer.write_all(&header.frame_count.to_le_bytes())?;
        writer.write_all(&header.coeff_width.to_le_bytes())?;

        for frame in features {
            for &coeff in frame {
                writer.write_all(&coeff.to_le_bytes())?;
            }
        }

        writer.flush()?;

        log::debug!(
            "Wrote {} feature frames ({} coefficients each) to {}",
            features.len(),
            width,
            path.display()
        );

        Ok(())
    }
}
