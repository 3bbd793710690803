//! Ordered, monotonic progress delivery for one extraction

use std::sync::{Arc, Mutex};

/// Progress callback, percent in 0..=100
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Serializes progress updates for a single file.
///
/// Values are clamped to 100 and never go backwards; repeats are dropped, so the
/// callback sees a strictly increasing sequence. The lock is held while the
/// callback runs, which keeps deliveries ordered even if OCR pages finish on
/// different threads.
pub struct ProgressSink {
    last: Mutex<Option<u8>>,
    callback: Option<ProgressCallback>,
}

impl ProgressSink {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            last: Mutex::new(None),
            callback,
        }
    }

    /// Sink that only tracks the high-water mark
    pub fn silent() -> Self {
        Self::new(None)
    }

    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        if matches!(*last, Some(prev) if prev >= percent) {
            return;
        }
        *last = Some(percent);

        if let Some(ref callback) = self.callback {
            callback(percent);
        }
    }

    /// Report `done` of `total` units as a percentage
    pub fn report_fraction(&self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = ((done.min(total) * 100) / total) as u8;
        self.report(percent);
    }

    /// Emit the terminal 100 if it has not been reported yet
    pub fn complete(&self) {
        self.report(100);
    }

    /// Highest value delivered so far
    pub fn last(&self) -> Option<u8> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = ProgressSink::new(Some(Arc::new(move |p| seen_clone.lock().unwrap().push(p))));
        (sink, seen)
    }

    #[test]
    fn test_drops_regressions_and_repeats() {
        let (sink, seen) = recording_sink();
        for p in [0, 30, 30, 10, 70, 200] {
            sink.report(p);
        }
        sink.complete();
        assert_eq!(*seen.lock().unwrap(), vec![0, 30, 70, 100]);
        assert_eq!(sink.last(), Some(100));
    }

    #[test]
    fn test_report_fraction() {
        let (sink, seen) = recording_sink();
        sink.report_fraction(0, 3);
        sink.report_fraction(1, 3);
        sink.report_fraction(2, 3);
        sink.report_fraction(3, 3);
        sink.report_fraction(1, 0);
        assert_eq!(*seen.lock().unwrap(), vec![0, 33, 66, 100]);
    }

    #[test]
    fn test_silent_sink_tracks_last() {
        let sink = ProgressSink::silent();
        assert_eq!(sink.last(), None);
        sink.report(42);
        assert_eq!(sink.last(), Some(42));
    }
}
