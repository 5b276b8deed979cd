//! callgen - Precompute reference call feature files
//!
//! Usage: callgen <input.wav>... --output-dir <dir>

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use wildcall_core::MfccSettings;

#[derive(Parser, Debug)]
#[command(name = "callgen")]
#[command(about = "Generate .mfc feature files from reference call WAVs", long_about = None)]
struct Args {
    /// Input WAV files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for .mfc files
    #[arg(short, long, default_value = "data/features")]
    output_dir: PathBuf,

    /// Engine config TOML (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Warn)
            .init();
    }

    let settings = match &args.config {
        Some(path) => wildcall_core::EngineConfig::from_toml_file(path)?.mfcc,
        None => MfccSettings::default(),
    };

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            args.output_dir.display()
        )
    })?;

    let failures: Vec<_> = args
        .inputs
        .par_iter()
        .filter_map(|input| {
            generate_one(input, &args.output_dir, &settings)
                .map_err(|e| {
                    log::error!("{}: {:#}", input.display(), e);
                    input.clone()
                })
                .err()
        })
        .collect();

    if !failures.is_empty() {
        anyhow::bail!("{} of {} inputs failed", failures.len(), args.inputs.len());
    }

    Ok(())
}

fn generate_one(input: &Path, output_dir: &Path, settings: &MfccSettings) -> Result<()> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("Input has no usable file name: {}", input.display()))?;

    let start = std::time::Instant::now();
    let (features, sample_rate) = wildcall_core::compute_call_features(input, settings)?;

    if features.is_empty() {
        anyhow::bail!("{}: too short to produce any feature frames", input.display());
    }

    let output_path = output_dir.join(format!("{stem}.mfc"));
    wildcall_fc::FcWriter::write(&output_path, &features)?;

    log::info!(
        "{}: {} frames @ {} Hz -> {} ({:.1} ms)",
        input.display(),
        features.len(),
        sample_rate,
        output_path.display(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
