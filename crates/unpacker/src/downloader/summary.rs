//! Run accounting
//!
//! Workers report terminal tasks to a [`SummaryRecorder`]. The recorder
//! updates the [`RunSummary`] and emits the progress event under one lock, so
//! observers see a non-decreasing progress sequence ending at 100.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::downloader::core::EventEmitter;
use crate::downloader::task::{DownloadTask, SkipReason, TaskOutcome};
use crate::manifest::ModReference;
use crate::overrides::ExtractionReport;

/// A task that ended in failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub reference: ModReference,
    /// [`TaskError::category`](crate::downloader::TaskError::category)
    pub category: &'static str,
    pub message: String,
}

/// A task that was not attempted to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSkip {
    pub reference: ModReference,
    pub reason: SkipReason,
}

/// Aggregate result of an unpack run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<TaskFailure>,
    pub skips: Vec<TaskSkip>,
    pub written: Vec<PathBuf>,
    pub bytes_written: u64,
    /// Set once overrides were extracted
    pub overrides: Option<ExtractionReport>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Tasks that reached a terminal state
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.completed().min(self.total) * 100 / self.total) as u8
    }

    /// No failures and not cancelled
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    pub(crate) fn record(&mut self, reference: ModReference, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Written { path, bytes } => {
                self.succeeded += 1;
                self.bytes_written += bytes;
                self.written.push(path);
            }
            TaskOutcome::Failed(error) => {
                self.failed += 1;
                self.failures.push(TaskFailure {
                    reference,
                    category: error.category(),
                    message: error.detailed_message(),
                });
            }
            TaskOutcome::Skipped(reason) => {
                self.skipped += 1;
                if reason == SkipReason::Cancelled {
                    self.cancelled = true;
                }
                self.skips.push(TaskSkip { reference, reason });
            }
        }
    }
}

/// Shared recorder handed to every worker
#[derive(Debug)]
pub(crate) struct SummaryRecorder {
    summary: Mutex<RunSummary>,
    events: EventEmitter,
    started: Instant,
}

impl SummaryRecorder {
    pub(crate) fn new(total: usize, events: EventEmitter) -> Self {
        Self {
            summary: Mutex::new(RunSummary::new(total)),
            events,
            started: Instant::now(),
        }
    }

    /// Record a task and emit the new progress value
    pub(crate) fn record(&self, task: DownloadTask) {
        let reference = task.reference;
        let outcome = task.into_outcome();

        let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        summary.record(reference, outcome);
        self.events.progress(summary.progress_percent());
    }

    /// Take the accumulated summary
    pub(crate) fn finish(&self) -> RunSummary {
        let mut summary = std::mem::take(
            &mut *self.summary.lock().unwrap_or_else(PoisonError::into_inner),
        );
        summary.elapsed = self.started.elapsed();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::core::TaskError;

    #[test]
    fn test_record_counts_each_outcome() {
        let mut summary = RunSummary::new(3);
        summary.record(
            ModReference::new(1, 1),
            TaskOutcome::Written { path: PathBuf::from("a.jar"), bytes: 4 },
        );
        summary.record(
            ModReference::new(2, 2),
            TaskOutcome::Failed(TaskError::HttpStatus { url: "u".into(), status: 404 }),
        );
        assert_eq!(summary.progress_percent(), 66);

        summary.record(ModReference::new(3, 3), TaskOutcome::Skipped(SkipReason::OptionalMod));

        assert_eq!(summary.completed(), 3);
        assert_eq!(summary.progress_percent(), 100);
        assert_eq!(summary.failures[0].category, "http_status");
        assert_eq!(summary.failures[0].reference, ModReference::new(2, 2));
        assert_eq!(summary.written, vec![PathBuf::from("a.jar")]);
        assert!(!summary.cancelled);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_cancelled_skip_marks_summary() {
        let mut summary = RunSummary::new(1);
        summary.record(ModReference::new(1, 1), TaskOutcome::Skipped(SkipReason::Cancelled));
        assert!(summary.cancelled);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_recorder_emits_progress_per_task() {
        use crate::downloader::core::UnpackEvent;
        use std::sync::Arc;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let events = EventEmitter::new(Arc::new(move |event| {
            if let UnpackEvent::Progress(p) = event {
                sink.lock().unwrap().push(p);
            }
        }));

        let recorder = SummaryRecorder::new(4, events);
        for i in 1..=4 {
            recorder.record(DownloadTask::new(i as usize, ModReference::new(i, i)));
        }
        let summary = recorder.finish();

        assert_eq!(*seen.lock().unwrap(), vec![25, 50, 75, 100]);
        assert_eq!(summary.skipped, 4);
        assert!(summary.cancelled);
    }

    #[test]
    fn test_empty_run_is_complete() {
        let summary = RunSummary::new(0);
        assert_eq!(summary.progress_percent(), 100);
        assert!(summary.is_success());
    }
}
