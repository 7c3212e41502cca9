//! Pause seam for throttle and retry sleeps

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Why the engine is pausing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauseKind {
    /// Between failed attempts for one recipient
    Backoff,
    /// After every attempted recipient
    Throttle,
}

/// Performs the engine's pauses
#[trait_variant::make(Pacer: Send)]
pub trait LocalPacer {
    async fn pause(&self, kind: PauseKind, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    async fn pause(&self, _kind: PauseKind, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Records requested pauses and returns immediately
///
/// Clones share the recorded list.
#[derive(Debug, Clone, Default)]
pub struct RecordingPacer {
    pauses: Arc<Mutex<Vec<(PauseKind, Duration)>>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pause requested so far, in order
    pub fn pauses(&self) -> Vec<(PauseKind, Duration)> {
        self.pauses.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Pauses of one kind, in order
    pub fn durations(&self, kind: PauseKind) -> Vec<Duration> {
        self.pauses()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, d)| d)
            .collect()
    }
}

impl Pacer for RecordingPacer {
    async fn pause(&self, kind: PauseKind, duration: Duration) {
        self.pauses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((kind, duration));
    }
}

#[cfg(test)]
mod tests {
    use super::{Duration, Pacer, PauseKind, RecordingPacer, TokioPacer};

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pacer_sleeps() {
        let start = tokio::time::Instant::now();
        TokioPacer
            .pause(PauseKind::Throttle, Duration::from_millis(1500))
            .await;
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_recording_pacer_filters_by_kind() {
        let pacer = RecordingPacer::new();
        pacer.pause(PauseKind::Backoff, Duration::from_secs(2)).await;
        pacer.pause(PauseKind::Throttle, Duration::from_secs(1)).await;
        pacer.pause(PauseKind::Backoff, Duration::from_secs(4)).await;

        assert_eq!(
            pacer.durations(PauseKind::Backoff),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(pacer.pauses().len(), 3);
    }
}
