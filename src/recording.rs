use anyhow::{Context, Result};
use hound::{WavSpec, WavWriter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One captured session, exclusively owned by the capture worker until flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAudio {
    /// Interleaved channel count.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved 16-bit PCM samples.
    pub samples: Vec<i16>,
}

/// On-disk store for sequence-numbered recording files.
///
/// Files are named `recording-<N>.wav`. Exactly one writer (the capture
/// worker) and one reader-and-deleter (the transcription worker).
#[derive(Debug)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    /// Opens the store, creating the directory if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create recordings directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Path of the recording file for `seq`.
    #[must_use]
    pub fn path(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("recording-{seq}.wav"))
    }

    /// Writes one session to `recording-<seq>.wav` as 16-bit integer PCM.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or written.
    pub fn write(&self, seq: u64, audio: &RecordedAudio) -> Result<PathBuf> {
        let path = self.path(seq);
        let spec = WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = WavWriter::create(&path, spec)
            .with_context(|| format!("failed to create {}", path.display()))?;
        for &sample in &audio.samples {
            writer.write_sample(sample).context("failed to write sample")?;
        }
        writer.finalize().context("failed to finalize WAV file")?;

        debug!(
            seq,
            samples = audio.samples.len(),
            path = %path.display(),
            "recording flushed"
        );
        Ok(path)
    }

    /// Reads the raw bytes of recording `seq` (the full WAV container).
    ///
    /// # Errors
    /// Returns error if the file is missing or unreadable.
    pub fn load_bytes(&self, seq: u64) -> Result<Vec<u8>> {
        let path = self.path(seq);
        fs::read(&path).with_context(|| format!("failed to read {}", path.display()))
    }

    /// Deletes the consumed recording `seq`.
    ///
    /// # Errors
    /// Returns error if the file cannot be removed.
    pub fn remove(&self, seq: u64) -> Result<()> {
        let path = self.path(seq);
        fs::remove_file(&path).with_context(|| format!("failed to delete {}", path.display()))
    }

    /// Removes recordings left behind by a previous process.
    ///
    /// Numbering restarts at 1 every launch, so stale files (including ones
    /// retained after a transcription failure) must not collide with the new
    /// session's files. Individual deletion failures are logged, not fatal.
    /// Returns the number of files removed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be listed.
    pub fn sweep(&self) -> Result<usize> {
        let mut removed = 0;
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read {}", self.dir.display()))?;

        for entry in entries.filter_map(std::result::Result::ok) {
            let path = entry.path();
            if !is_recording_file(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    removed += 1;
                    debug!(path = %path.display(), "removed stale recording");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale recording"),
            }
        }

        Ok(removed)
    }
}

fn is_recording_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.strip_prefix("recording-")
        .and_then(|rest| rest.strip_suffix(".wav"))
        .is_some_and(|seq| seq.parse::<u64>().is_ok())
}
