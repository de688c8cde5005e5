//! Download tasks and the shared task queue

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::downloader::api::ModInfo;
use crate::downloader::core::TaskError;
use crate::manifest::ModReference;

/// Why a task ended without being attempted to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `required: false` with [`OptionalModPolicy::Skip`](crate::downloader::OptionalModPolicy::Skip)
    OptionalMod,
    /// The run was cancelled before or while the task ran
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::OptionalMod => write!(f, "optional mod"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal result of a task
#[derive(Debug)]
pub enum TaskOutcome {
    Written { path: PathBuf, bytes: u64 },
    Failed(TaskError),
    Skipped(SkipReason),
}

/// Resolution state of a task
#[derive(Debug)]
pub enum TaskState {
    Pending,
    MetadataFetched { info: ModInfo },
    Downloading { info: ModInfo, destination: PathBuf },
    Done(TaskOutcome),
}

/// Runtime wrapper around a [`ModReference`]
#[derive(Debug)]
pub struct DownloadTask {
    /// Position of the reference in the manifest
    pub index: usize,
    pub reference: ModReference,
    pub state: TaskState,
}

impl DownloadTask {
    pub fn new(index: usize, reference: ModReference) -> Self {
        Self {
            index,
            reference,
            state: TaskState::Pending,
        }
    }

    /// Destination of a write that may be in progress
    pub fn pending_destination(&self) -> Option<&PathBuf> {
        match &self.state {
            TaskState::Downloading { destination, .. } => Some(destination),
            _ => None,
        }
    }

    pub fn mod_name(&self) -> Option<&str> {
        match &self.state {
            TaskState::MetadataFetched { info } | TaskState::Downloading { info, .. } => {
                Some(info.name.as_str())
            }
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, TaskState::Done(_))
    }

    pub fn finish(&mut self, outcome: TaskOutcome) {
        self.state = TaskState::Done(outcome);
    }

    /// Terminal outcome; a task that never finished was interrupted by cancellation
    pub fn into_outcome(self) -> TaskOutcome {
        match self.state {
            TaskState::Done(outcome) => outcome,
            _ => TaskOutcome::Skipped(SkipReason::Cancelled),
        }
    }
}

/// Not-yet-started tasks shared by the worker pool
///
/// `pop` checks for and removes the next task under one lock acquisition, so
/// concurrent workers can never receive the same task.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<DownloadTask>>,
}

impl TaskQueue {
    pub fn new<I: IntoIterator<Item = DownloadTask>>(tasks: I) -> Self {
        Self {
            tasks: Mutex::new(tasks.into_iter().collect()),
        }
    }

    pub fn from_references(references: &[ModReference]) -> Self {
        Self::new(
            references
                .iter()
                .enumerate()
                .map(|(index, reference)| DownloadTask::new(index, *reference)),
        )
    }

    /// Dequeue the next task, or `None` once the queue is empty
    pub fn pop(&self) -> Option<DownloadTask> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Remove every remaining task
    pub fn drain(&self) -> Vec<DownloadTask> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
