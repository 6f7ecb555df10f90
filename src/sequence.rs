use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter of fully captured, ready-to-transcribe recordings.
///
/// Exactly one writer (the capture worker) and one reader (the transcription
/// worker), so no lock is needed. `publish` uses Release ordering and `ready`
/// uses Acquire, so the recording file is visible on disk before its number.
#[derive(Debug, Default)]
pub struct SequenceIndex {
    ready: AtomicU64,
}

impl SequenceIndex {
    /// Creates an index with no recordings published.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ready: AtomicU64::new(0),
        }
    }

    /// Highest sequence number whose recording has been flushed to disk.
    #[must_use]
    pub fn ready(&self) -> u64 {
        self.ready.load(Ordering::Acquire)
    }

    /// Number the next successful capture session will claim.
    ///
    /// A session claims its number only when it flushes, so a failed session
    /// never leaves a hole in the numbering.
    #[must_use]
    pub fn next(&self) -> u64 {
        self.ready() + 1
    }

    /// Marks `seq` as ready to transcribe.
    ///
    /// Must be called with `next()` after the recording file is fully written.
    pub fn publish(&self, seq: u64) {
        self.ready.store(seq, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let index = SequenceIndex::new();
        assert_eq!(index.ready(), 0);
        assert_eq!(index.next(), 1);
    }

    #[test]
    fn publish_advances_ready() {
        let index = SequenceIndex::new();
        index.publish(index.next());
        assert_eq!(index.ready(), 1);
        index.publish(index.next());
        assert_eq!(index.ready(), 2);
        assert_eq!(index.next(), 3);
    }

    #[test]
    fn ready_is_monotonic_across_threads() {
        use std::sync::Arc;

        let index = Arc::new(SequenceIndex::new());
        let writer = {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    index.publish(index.next());
                }
            })
        };

        let mut last = 0;
        while last < 1000 {
            let seen = index.ready();
            assert!(seen >= last, "ready went backwards: {seen} < {last}");
            last = last.max(seen);
        }

        writer.join().unwrap();
        assert_eq!(index.ready(), 1000);
    }
}
