//! Downloader module
//!
//! This module contains the mod download pipeline: the remote API client,
//! configuration, task bookkeeping and the concurrent coordinator.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod core;
pub mod summary;
pub mod task;

// Re-export main types for convenience
pub use api::{ApiKey, CurseForgeAPI, ModInfo, ModRepository, API_KEY_ENV};
pub use config::{DownloadConfig, DownloadConfigBuilder, OptionalModPolicy};
pub use coordinator::{jar_file_name, DownloadCoordinator, OutputLayout, MODS_DIR};
pub use core::{
    CompositeEventSink, ConsoleEventSink, EventCallback, EventEmitter, EventSink, FileOperation,
    IntoEventCallback, NullEventSink, TaskError, TaskResult, UnpackEvent, UnpackState,
};
pub use summary::{RunSummary, TaskFailure, TaskSkip};
pub use task::{DownloadTask, SkipReason, TaskOutcome, TaskQueue, TaskState};

#[cfg(test)]
pub(crate) mod testing;
