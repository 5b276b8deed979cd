//! Engine configuration
//!
//! Carries the VAD and MFCC parameters plus the on-disk layout the
//! engine works against. Loadable from TOML; defaults match the
//! reference call analysis pipeline.

use crate::mfcc::MfccSettings;
use crate::vad::VadConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding reference call waveforms (`<id>.wav`)
    pub reference_dir: PathBuf,
    /// Directory holding precomputed feature files (`<id>.mfc`)
    pub cache_dir: PathBuf,
    /// Directory saved recordings are written into
    pub recording_dir: PathBuf,

    /// Hard cap on a session's rolling sample buffer
    pub max_buffer_samples: usize,

    pub vad: VadConfig,
    pub mfcc: MfccSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_dir: PathBuf::from("data/reference_calls"),
            cache_dir: PathBuf::from("data/features"),
            recording_dir: PathBuf::from("data/recordings"),
            max_buffer_samples: 1_048_576,
            vad: VadConfig::default(),
            mfcc: MfccSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_buffer_samples == 0 {
            anyhow::bail!("max_buffer_samples must be > 0");
        }
        self.vad.validate()?;
        self.mfcc.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.max_buffer_samples, config.max_buffer_samples);
        assert_eq!(parsed.mfcc.num_coeffs, config.mfcc.num_coeffs);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: EngineConfig = toml::from_str("max_buffer_samples = 4096").unwrap();
        assert_eq!(parsed.max_buffer_samples, 4096);
        assert_eq!(parsed.mfcc.frame_size, MfccSettings::default().frame_size);
    }

    #[test]
    fn test_zero_buffer_cap_rejected() {
        let config = EngineConfig {
            max_buffer_samples: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
