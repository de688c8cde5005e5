//! Concurrent download coordinator
//!
//! A fixed pool of tokio tasks drains a shared [`TaskQueue`]. Each worker
//! resolves a mod's metadata, streams its file to disk and reports the
//! terminal outcome to the [`SummaryRecorder`]. Per-task failures never stop
//! the pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::downloader::api::ModRepository;
use crate::downloader::config::{DownloadConfig, OptionalModPolicy};
use crate::downloader::core::http::remove_partial;
use crate::downloader::core::{EventEmitter, TaskError, TaskResult};
use crate::downloader::summary::{RunSummary, SummaryRecorder};
use crate::downloader::task::{DownloadTask, SkipReason, TaskOutcome, TaskQueue, TaskState};
use crate::error::{Result, UnpackError};
use crate::manifest::ModReference;

/// Subfolder holding mods when overrides are unpacked next to them
pub const MODS_DIR: &str = "mods";

/// Where mod files are placed relative to the output directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputLayout {
    /// `outputDir/<slug>.jar`
    #[default]
    Flat,
    /// `outputDir/mods/<slug>.jar`, used when overrides are included
    ModsFolder,
}

impl OutputLayout {
    pub fn for_overrides(include_overrides: bool) -> Self {
        if include_overrides {
            OutputLayout::ModsFolder
        } else {
            OutputLayout::Flat
        }
    }

    pub fn mods_dir(&self, output_dir: &Path) -> PathBuf {
        match self {
            OutputLayout::Flat => output_dir.to_path_buf(),
            OutputLayout::ModsFolder => output_dir.join(MODS_DIR),
        }
    }
}

/// File name for a mod slug, or `None` when the slug could escape the target directory
pub fn jar_file_name(slug: &str) -> Option<String> {
    let slug = slug.trim();
    if slug.is_empty()
        || slug.contains('/')
        || slug.contains('\\')
        || slug.contains("..")
        || slug.contains('\0')
    {
        return None;
    }
    Some(format!("{slug}.jar"))
}

/// Drives the worker pool for one run
pub struct DownloadCoordinator {
    repository: Arc<dyn ModRepository>,
    config: DownloadConfig,
    events: EventEmitter,
    cancel: CancellationToken,
}

impl std::fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("max_workers", &self.config.max_workers)
            .field("optional_mods", &self.config.optional_mods)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl DownloadCoordinator {
    pub fn new(repository: Arc<dyn ModRepository>, config: DownloadConfig) -> Self {
        Self {
            repository,
            config,
            events: EventEmitter::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Download every reference into `output_dir` and return the run summary
    ///
    /// Returns an error only when the mods directory cannot be created or a
    /// worker panics. Every other failure is recorded per task.
    pub async fn run(
        &self,
        references: &[ModReference],
        output_dir: &Path,
        layout: OutputLayout,
    ) -> Result<RunSummary> {
        let mods_dir = layout.mods_dir(output_dir);
        tokio::fs::create_dir_all(&mods_dir)
            .await
            .map_err(|source| UnpackError::OutputDirectory {
                path: mods_dir.clone(),
                source,
            })?;

        let total = references.len();
        let recorder = Arc::new(SummaryRecorder::new(total, self.events.clone()));
        if total == 0 {
            debug!("No mods to download");
            self.events.progress(100);
            return Ok(recorder.finish());
        }

        let worker_count = self.config.max_workers.clamp(1, total);
        info!("Spawning {} download workers for {} mods", worker_count, total);

        let context = Arc::new(WorkerContext {
            repository: self.repository.clone(),
            queue: TaskQueue::from_references(references),
            recorder: recorder.clone(),
            events: self.events.clone(),
            cancel: self.cancel.clone(),
            optional_mods: self.config.optional_mods,
            mods_dir,
            claimed: Mutex::new(HashSet::new()),
        });

        let handles: Vec<_> = (0..worker_count)
            .map(|worker| {
                let context = context.clone();
                tokio::spawn(async move { context.work(worker).await })
            })
            .collect();

        // Join every worker before reporting a panic so none outlives the run
        let mut joined = Ok(());
        for handle in handles {
            if let Err(e) = handle.await {
                if joined.is_ok() {
                    joined = Err(e);
                }
            }
        }
        joined?;

        // Tasks left behind by a cancelled run
        let leftover = context.queue.drain();
        if !leftover.is_empty() {
            debug!("{} tasks were never dispatched", leftover.len());
        }
        for task in leftover {
            recorder.record(task);
        }

        Ok(recorder.finish())
    }
}

struct WorkerContext {
    repository: Arc<dyn ModRepository>,
    queue: TaskQueue,
    recorder: Arc<SummaryRecorder>,
    events: EventEmitter,
    cancel: CancellationToken,
    optional_mods: OptionalModPolicy,
    mods_dir: PathBuf,
    /// Destinations owned by a task of this run
    claimed: Mutex<HashSet<PathBuf>>,
}

impl WorkerContext {
    async fn work(&self, worker: usize) {
        debug!("Worker {} started", worker);

        while !self.cancel.is_cancelled() {
            let Some(mut task) = self.queue.pop() else {
                break;
            };

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                outcome = self.process(&mut task) => Some(outcome),
            };

            match outcome {
                Some(outcome) => task.finish(outcome),
                None => {
                    debug!(
                        "Worker {} abandoned {} ({})",
                        worker,
                        task.reference,
                        task.mod_name().unwrap_or("unresolved")
                    );
                    if let Some(path) = task.pending_destination() {
                        remove_partial(path).await;
                    }
                }
            }

            self.recorder.record(task);
        }

        debug!("Worker {} finished", worker);
    }

    async fn process(&self, task: &mut DownloadTask) -> TaskOutcome {
        let reference = task.reference;

        if !reference.required && self.optional_mods == OptionalModPolicy::Skip {
            self.events.output(format!("Skipping optional mod: {}", reference));
            return TaskOutcome::Skipped(SkipReason::OptionalMod);
        }

        match self.fetch(task).await {
            Ok((path, bytes)) => TaskOutcome::Written { path, bytes },
            Err(e) => {
                self.events
                    .output(format!("Error: {} ({})", e.detailed_message(), reference));
                TaskOutcome::Failed(e)
            }
        }
    }

    async fn fetch(&self, task: &mut DownloadTask) -> TaskResult<(PathBuf, u64)> {
        let info = self.repository.resolve_mod(&task.reference).await?;
        task.state = TaskState::MetadataFetched { info: info.clone() };

        let file_name = jar_file_name(&info.slug).ok_or_else(|| TaskError::InvalidResponse {
            url: format!("mod {}", task.reference.project_id),
            reason: format!("unsafe slug '{}'", info.slug),
        })?;

        let destination = self.mods_dir.join(file_name);
        self.claim(&destination)?;

        self.events.output(format!("Downloading mod: {}", info.name));
        task.state = TaskState::Downloading {
            info,
            destination: destination.clone(),
        };

        let bytes = self
            .repository
            .download_file(&task.reference, &destination)
            .await?;
        debug!("Wrote {} ({} bytes)", destination.display(), bytes);

        Ok((destination, bytes))
    }

    /// First task to reach a destination owns it for the rest of the run
    fn claim(&self, destination: &Path) -> TaskResult<()> {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        if claimed.insert(destination.to_path_buf()) {
            Ok(())
        } else {
            Err(TaskError::DuplicateDestination {
                path: destination.to_path_buf(),
            })
        }
    }
}
