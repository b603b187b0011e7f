//! Content-addressed WAV cache
//!
//! One file per distinct final text, named `<key>.wav` where the key is a
//! truncated SHA-256 hex digest of the text's UTF-8 bytes. The directory
//! listing is the index. Files are written once and never modified.
//!
//! Writes go through a temp file in the same directory and an atomic
//! rename. First-time synthesis of a key is exactly-once within a process:
//! concurrent misses for the same key wait on a per-key lock and re-check.

use std::future::Future;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, MutexGuard};

use nepali_tts_core::{Error, Result, Waveform};

use crate::PipelineError;

/// Longest possible key (full SHA-256 hex digest)
const MAX_KEY_LENGTH: usize = 64;

/// Deterministic cache key for `text`: the first `length` hex characters of
/// its SHA-256 digest.
pub fn cache_key(text: &str, length: usize) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex.truncate(length.clamp(1, MAX_KEY_LENGTH));
    hex
}

/// Whether a request was served from disk or synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Handle to a cached WAV file
#[derive(Debug, Clone)]
pub struct CachedAudio {
    pub key: String,
    pub path: PathBuf,
    pub status: CacheStatus,
}

pub struct AudioCache {
    dir: PathBuf,
    key_length: usize,
    headroom: f32,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl AudioCache {
    /// Open (creating if needed) the cache directory
    pub fn open(
        dir: impl Into<PathBuf>,
        key_length: usize,
        headroom: f32,
    ) -> std::result::Result<Self, PipelineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::Cache(format!("Cannot create cache dir {}: {}", dir.display(), e))
        })?;

        tracing::info!(dir = %dir.display(), key_length, "Audio cache ready");

        Ok(Self {
            dir,
            key_length,
            headroom,
            in_flight: DashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_for(&self, text: &str) -> String {
        cache_key(text, self.key_length)
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.wav", key))
    }

    /// Existing file for `text`, if any. Never synthesizes.
    pub async fn lookup(&self, text: &str) -> Option<CachedAudio> {
        let key = self.key_for(text);
        let path = self.path_for(&key);
        is_file(&path).await.then_some(CachedAudio {
            key,
            path,
            status: CacheStatus::Hit,
        })
    }

    /// Return the cached file for `text`, calling `produce` to synthesize it
    /// on a miss.
    ///
    /// The produced waveform is peak-normalized with the configured headroom
    /// and written as mono 16-bit PCM at its own sample rate.
    pub async fn get_or_create<F, Fut>(&self, text: &str, produce: F) -> Result<CachedAudio>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Waveform>>,
    {
        if let Some(hit) = self.lookup(text).await {
            return Ok(hit);
        }

        let key = self.key_for(text);
        let path = self.path_for(&key);

        let in_flight = InFlight::register(&self.in_flight, key.clone());

        let _guard = in_flight.lock().await;

        // Another request may have written it while we waited
        if is_file(&path).await {
            return Ok(CachedAudio {
                key,
                path,
                status: CacheStatus::Hit,
            });
        }

        self.create(key, path, produce).await
    }

    async fn create<F, Fut>(&self, key: String, path: PathBuf, produce: F) -> Result<CachedAudio>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Waveform>>,
    {
        let mut waveform = produce().await?;
        if waveform.is_empty() {
            return Err(Error::synthesis("empty waveform"));
        }

        waveform.peak_normalize(self.headroom);

        let dir = self.dir.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_wav_atomic(&dir, &target, &waveform))
            .await
            .map_err(|e| Error::Cache(format!("Cache writer task failed: {}", e)))??;

        tracing::debug!(key = %key, path = %path.display(), "Cached new audio");

        Ok(CachedAudio {
            key,
            path,
            status: CacheStatus::Miss,
        })
    }
}

impl std::fmt::Debug for AudioCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCache")
            .field("dir", &self.dir)
            .field("key_length", &self.key_length)
            .field("headroom", &self.headroom)
            .finish()
    }
}

/// Membership in the per-key lock map.
///
/// Dropping it removes the map entry once no other request holds it,
/// including when the owning future is cancelled mid-synthesis.
struct InFlight<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn register(map: &'a DashMap<String, Arc<Mutex<()>>>, key: String) -> Self {
        let lock = map
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self { map, key, lock }
    }

    async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        // Held by the map and by us: nobody else is waiting
        self.map.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn write_wav_atomic(
    dir: &Path,
    target: &Path,
    waveform: &Waveform,
) -> std::result::Result<(), PipelineError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".pending-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = hound::WavWriter::new(BufWriter::new(tmp.as_file_mut()), spec)?;
        for sample in waveform.to_pcm16() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}
