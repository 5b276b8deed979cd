//! callscore - Score a call attempt against a reference call
//!
//! Usage: callscore <reference_id> <attempt.wav>
//!
//! Streams the attempt through an analysis session in fixed-size chunks
//! (the same path a live microphone feed takes) and prints the
//! similarity score as JSON.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use wildcall_cli::output::{print_json, ScoreOutput};
use wildcall_core::{CallEngine, EngineConfig};

#[derive(Parser, Debug)]
#[command(name = "callscore")]
#[command(about = "Score a recorded call attempt against a reference call", long_about = None)]
struct Args {
    /// Reference call identifier (resolved under the reference directory)
    reference_id: String,

    /// Input WAV file with the call attempt
    input: PathBuf,

    /// Engine config TOML (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Samples per submitted chunk
    #[arg(long, default_value_t = 4096)]
    chunk_size: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: warnings only, keeping stdout as clean JSON.
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Warn)
            .init();
    }

    let config = match &args.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };

    let engine = CallEngine::new(config)?;
    engine
        .load_reference(&args.reference_id)
        .with_context(|| format!("Failed to load reference '{}'", args.reference_id))?;

    let audio = wildcall_core::audio::decode_wav(&args.input)?;
    let sample_rate = audio.sample_rate as f32;
    let mono = audio.to_mono();

    let session = engine.create_session(sample_rate)?;

    for chunk in mono.chunks(args.chunk_size.max(1)) {
        engine.submit_audio(session, chunk)?;
    }

    // Trailing silence flushes any segment still open at end of file.
    let flush = vec![0.0f32; (sample_rate * 0.5) as usize];
    for chunk in flush.chunks(args.chunk_size.max(1)) {
        engine.submit_audio(session, chunk)?;
    }

    let session_frames = engine.session_feature_count(session)?;
    let score = engine
        .similarity_score(session)
        .context("Scoring failed (no voiced audio detected in the input?)")?;

    engine.end_session(session);

    print_json(&ScoreOutput {
        input_path: args.input.display().to_string(),
        reference_id: args.reference_id,
        sample_rate,
        session_frames,
        score,
        analyzed_at: Utc::now(),
    });

    Ok(())
}
