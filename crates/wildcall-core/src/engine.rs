//! Session manager
//!
//! `CallEngine` owns the session and recording tables, the resident
//! reference profile, and the comparator. It is an explicit object:
//! callers construct as many independent engines as they need.
//!
//! Locking discipline: each table sits behind a reader/writer lock that
//! guards only the id -> entry map. Chunk submission and score queries
//! clone the entry's `Arc` under the read lock, drop it, then lock the
//! entry's own mutex, so unrelated sessions never serialize and an
//! entry outlives a concurrent `end_session`. The reference profile has
//! its own lock, decoupled from both tables; replacement is an atomic
//! swap. IDs come from monotonically increasing atomic counters and are
//! never reused.

use crate::audio;
use crate::config::EngineConfig;
use crate::dtw::{similarity_from_distance, Comparator, DtwComparator};
use crate::error::EngineError;
use crate::mfcc::MfccExtractor;
use crate::recorder::{sanitize_recording_filename, RecordingSession};
use crate::session::AnalysisSession;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

pub type SessionId = u32;
pub type RecordingId = u32;

/// The resident comparison target ("master call")
pub struct ReferenceProfile {
    pub id: String,
    pub features: Vec<Vec<f32>>,
    /// Rate the features were computed at; unknown when a cache hit
    /// had no readable source waveform alongside it.
    pub source_sample_rate: Option<f32>,
}

pub struct CallEngine {
    config: EngineConfig,

    sessions: RwLock<HashMap<SessionId, Arc<Mutex<AnalysisSession>>>>,
    next_session_id: AtomicU32,

    recordings: RwLock<HashMap<RecordingId, Arc<Mutex<RecordingSession>>>>,
    next_recording_id: AtomicU32,

    reference: RwLock<Option<ReferenceProfile>>,
    comparator: Box<dyn Comparator>,
}

impl CallEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidParameters(e.to_string()))?;

        Ok(Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU32::new(1),
            recordings: RwLock::new(HashMap::new()),
            next_recording_id: AtomicU32::new(1),
            reference: RwLock::new(None),
            comparator: Box::new(DtwComparator),
        })
    }

    /// Swap in an alternate sequence comparator
    pub fn with_comparator(mut self, comparator: Box<dyn Comparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Reference profile
    // ------------------------------------------------------------------

    /// Load a reference profile, trying the feature cache before
    /// recomputing from the source waveform. Idempotent when the
    /// requested profile is already resident.
    pub fn load_reference(&self, id: &str) -> Result<(), EngineError> {
        {
            let guard = self.reference.read().expect("reference lock poisoned");
            if guard.as_ref().is_some_and(|p| p.id == id) {
                log::debug!("Reference '{}' already resident", id);
                return Ok(());
            }
        }

        let profile = self.build_reference_profile(id)?;

        log::info!(
            "Loaded reference '{}': {} frames @ {:?} Hz",
            id,
            profile.features.len(),
            profile.source_sample_rate
        );

        // Built fully before the write lock: readers see the old profile
        // or the new one, never a partial state.
        let mut guard = self.reference.write().expect("reference lock poisoned");
        *guard = Some(profile);
        Ok(())
    }

    fn build_reference_profile(&self, id: &str) -> Result<ReferenceProfile, EngineError> {
        let wav_path = self.config.reference_dir.join(format!("{id}.wav"));
        let cache_path = self.config.cache_dir.join(format!("{id}.mfc"));

        // Cache first. Any reader failure is a miss, never fatal.
        if cache_path.exists() {
            match wildcall_fc::FcReader::read(&cache_path) {
                Ok(features) if !features.is_empty() => {
                    let source_sample_rate = match audio::wav_sample_rate(&wav_path) {
                        Ok(rate) => Some(rate as f32),
                        Err(e) => {
                            log::warn!(
                                "Reference '{}': cached features without readable source ({}), \
                                 rate compatibility cannot be checked",
                                id,
                                e
                            );
                            None
                        }
                    };
                    return Ok(ReferenceProfile {
                        id: id.to_string(),
                        features,
                        source_sample_rate,
                    });
                }
                Ok(_) => {
                    log::warn!("Reference '{}': cache file is empty, recomputing", id);
                }
                Err(e) => {
                    log::warn!("Reference '{}': rejecting cache ({}), recomputing", id, e);
                }
            }
        }

        // Fall back to computing from the waveform.
        if !wav_path.exists() {
            return Err(EngineError::FileNotFound(wav_path));
        }

        let audio_data = audio::decode_wav(&wav_path)
            .map_err(|e| EngineError::ProcessingError(e.to_string()))?;
        let sample_rate = audio_data.sample_rate as f32;
        let mono = audio_data.to_mono();

        let extractor = MfccExtractor::new(&self.config.mfcc, sample_rate)?;
        let features = extractor.extract(&mono)?;

        log::info!(
            "Computed {} feature frames for reference '{}' from {}",
            features.len(),
            id,
            wav_path.display()
        );

        // Best-effort cache write; a failure costs recomputation later,
        // nothing else.
        if let Err(e) = std::fs::create_dir_all(&self.config.cache_dir)
            .map_err(anyhow::Error::from)
            .and_then(|_| wildcall_fc::FcWriter::write(&cache_path, &features))
        {
            log::warn!("Reference '{}': failed to cache features: {}", id, e);
        }

        Ok(ReferenceProfile {
            id: id.to_string(),
            features,
            source_sample_rate: Some(sample_rate),
        })
    }

    /// Identifier of the resident reference profile, if any
    pub fn current_reference(&self) -> Option<String> {
        self.reference
            .read()
            .expect("reference lock poisoned")
            .as_ref()
            .map(|p| p.id.clone())
    }

    // ------------------------------------------------------------------
    // Analysis sessions
    // ------------------------------------------------------------------

    pub fn create_session(&self, sample_rate: f32) -> Result<SessionId, EngineError> {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = AnalysisSession::new(id, sample_rate, &self.config)?;

        let mut table = self.sessions.write().expect("session table poisoned");
        table.insert(id, Arc::new(Mutex::new(session)));

        log::info!("Started session {} at {} Hz", id, sample_rate);
        Ok(id)
    }

    fn session_entry(&self, id: SessionId) -> Result<Arc<Mutex<AnalysisSession>>, EngineError> {
        let table = self.sessions.read().expect("session table poisoned");
        table.get(&id).cloned().ok_or(EngineError::InvalidSession(id))
    }

    pub fn submit_audio(&self, id: SessionId, samples: &[f32]) -> Result<(), EngineError> {
        let entry = self.session_entry(id)?;
        let mut session = entry.lock().expect("session mutex poisoned");
        session.push_audio(samples)
    }

    pub fn similarity_score(&self, id: SessionId) -> Result<f32, EngineError> {
        let entry = self.session_entry(id)?;

        // Snapshot under the session mutex, compare outside it.
        let (features, session_rate) = {
            let session = entry.lock().expect("session mutex poisoned");
            (session.features().to_vec(), session.sample_rate())
        };

        let guard = self.reference.read().expect("reference lock poisoned");
        let profile = guard.as_ref().ok_or(EngineError::InsufficientData)?;

        if profile.features.is_empty() || features.is_empty() {
            return Err(EngineError::InsufficientData);
        }

        if let Some(ref_rate) = profile.source_sample_rate {
            if ref_rate != session_rate {
                return Err(EngineError::InvalidParameters(format!(
                    "session rate {} Hz is incompatible with reference rate {} Hz",
                    session_rate, ref_rate
                )));
            }
        }

        let distance = self.comparator.distance(&profile.features, &features)?;
        let score = similarity_from_distance(distance);

        log::debug!(
            "Session {}: DTW distance {:.4}, similarity {:.4}",
            id,
            distance,
            score
        );

        Ok(score)
    }

    /// Feature frames accumulated so far by a session
    pub fn session_feature_count(&self, id: SessionId) -> Result<usize, EngineError> {
        let entry = self.session_entry(id)?;
        let session = entry.lock().expect("session mutex poisoned");
        Ok(session.feature_count())
    }

    /// Release all session state; later operations on the id fail with
    /// InvalidSession.
    pub fn end_session(&self, id: SessionId) {
        let removed = {
            let mut table = self.sessions.write().expect("session table poisoned");
            table.remove(&id)
        };

        match removed {
            Some(entry) => {
                let session = entry.lock().expect("session mutex poisoned");
                log::info!(
                    "Ended session {} ({} feature frames, {:.1}s)",
                    id,
                    session.feature_count(),
                    session.started_at().elapsed().as_secs_f64()
                );
            }
            None => log::warn!("end_session: unknown session id {}", id),
        }
    }

    // ------------------------------------------------------------------
    // Recordings
    // ------------------------------------------------------------------

    pub fn start_recording(&self, sample_rate: f32) -> Result<RecordingId, EngineError> {
        let id = self.next_recording_id.fetch_add(1, Ordering::Relaxed);
        let recording = RecordingSession::new(id, sample_rate, self.config.max_buffer_samples)?;

        let mut table = self.recordings.write().expect("recording table poisoned");
        table.insert(id, Arc::new(Mutex::new(recording)));

        log::info!("Started recording {} at {} Hz", id, sample_rate);
        Ok(id)
    }

    fn recording_entry(
        &self,
        id: RecordingId,
    ) -> Result<Arc<Mutex<RecordingSession>>, EngineError> {
        let table = self.recordings.read().expect("recording table poisoned");
        table
            .get(&id)
            .cloned()
            .ok_or(EngineError::InvalidRecordingId(id))
    }

    /// Capture-callback boundary: append mono samples to a recording
    pub fn feed_recording(&self, id: RecordingId, samples: &[f32]) -> Result<(), EngineError> {
        let entry = self.recording_entry(id)?;
        let mut recording = entry.lock().expect("recording mutex poisoned");
        recording.push_samples(samples)
    }

    pub fn stop_recording(&self, id: RecordingId) -> Result<(), EngineError> {
        let entry = self.recording_entry(id)?;
        let mut recording = entry.lock().expect("recording mutex poisoned");
        recording.stop();
        log::info!(
            "Stopped recording {} ({:.1}s captured)",
            id,
            recording.duration_secs()
        );
        Ok(())
    }

    /// Finalize a recording to a WAV file and release it. The filename is
    /// sanitized of path separators and given a .wav extension.
    pub fn save_recording(&self, id: RecordingId, filename: &str) -> Result<PathBuf, EngineError> {
        if filename.is_empty() {
            return Err(EngineError::InvalidParameters(
                "recording filename must not be empty".into(),
            ));
        }

        let entry = self.recording_entry(id)?;

        let path = {
            let mut recording = entry.lock().expect("recording mutex poisoned");
            recording.stop();

            let safe_name = sanitize_recording_filename(filename);
            let path = self.config.recording_dir.join(safe_name);

            std::fs::create_dir_all(&self.config.recording_dir).map_err(|e| {
                EngineError::FileWriteError {
                    path: self.config.recording_dir.clone(),
                    reason: e.to_string(),
                }
            })?;

            audio::encode_wav(&path, recording.samples(), recording.sample_rate() as u32)
                .map_err(|e| EngineError::FileWriteError {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            path
        };

        // Only a successfully saved recording leaves the table.
        let mut table = self.recordings.write().expect("recording table poisoned");
        table.remove(&id);

        log::info!("Saved recording {} to {}", id, path.display());
        Ok(path)
    }

    /// Drop a recording without saving it
    pub fn discard_recording(&self, id: RecordingId) -> Result<(), EngineError> {
        let mut table = self.recordings.write().expect("recording table poisoned");
        table
            .remove(&id)
            .map(|_| log::info!("Discarded recording {}", id))
            .ok_or(EngineError::InvalidRecordingId(id))
    }

    /// True if any recording is still capturing
    pub fn is_recording(&self) -> bool {
        let table = self.recordings.read().expect("recording table poisoned");
        table
            .values()
            .any(|r| r.lock().expect("recording mutex poisoned").is_active())
    }

    /// Peak level across all active recordings
    pub fn recording_level(&self) -> f32 {
        let table = self.recordings.read().expect("recording table poisoned");
        table
            .values()
            .map(|r| {
                let rec = r.lock().expect("recording mutex poisoned");
                if rec.is_active() {
                    rec.level()
                } else {
                    0.0
                }
            })
            .fold(0.0f32, f32::max)
    }

    pub fn recording_duration(&self, id: RecordingId) -> Result<f64, EngineError> {
        let entry = self.recording_entry(id)?;
        let recording = entry.lock().expect("recording mutex poisoned");
        Ok(recording.duration_secs())
    }
}
