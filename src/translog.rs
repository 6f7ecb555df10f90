use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Append-only persistent transcript log.
///
/// One line per transcript, `"<timestamp>: <transcript>"`.
#[derive(Debug)]
pub struct TranscriptLog {
    path: PathBuf,
}

impl TranscriptLog {
    /// Opens the log at `path`, creating parent directories if needed.
    ///
    /// # Errors
    /// Returns error if a parent directory cannot be created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    /// Appends one timestamped transcript line.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or written.
    pub fn append(&self, transcript: &str) -> Result<()> {
        let line = format!(
            "{}: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            transcript
        );
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .context("failed to append transcript line")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let log = TranscriptLog::new(dir.path().join("transcribe.log")).unwrap();

        log.append("hello world").unwrap();
        log.append("second take").unwrap();

        let contents = std::fs::read_to_string(dir.path().join("transcribe.log")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(": hello world"));
        assert!(lines[1].ends_with(": second take"));
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("deep").join("transcribe.log");
        let log = TranscriptLog::new(&nested).unwrap();
        log.append("nested").unwrap();
        assert!(nested.exists());
    }
}
