//! Modpack Unpacker Library
//!
//! This library turns a CurseForge modpack export (a ZIP archive with a
//! `manifest.json` at its root) into a ready-to-use mods directory. It reads
//! the manifest, downloads every referenced mod through the CurseForge API
//! with a bounded worker pool, and optionally copies the bundled overrides
//! next to the mods.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use unpacker::{ApiKey, ConsoleEventSink, DownloadConfig, IntoEventCallback, Unpacker};
//! use std::path::Path;
//!
//! # async fn example() -> unpacker::Result<()> {
//! // Reads CURSEFORGE_API_KEY, loading .env first
//! let api_key = ApiKey::from_env()?;
//! let unpacker = Unpacker::new(DownloadConfig::default(), api_key)?;
//!
//! let modpack = Unpacker::load_manifest("All the Mods 9.zip").await?;
//! let summary = unpacker
//!     .run(
//!         modpack,
//!         Path::new("instances/atm9"),
//!         true,
//!         ConsoleEventSink::new(true).into_callback(),
//!     )
//!     .await?;
//!
//! println!("{} mods written, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Manifest validation**: malformed or incomplete manifests are rejected before any request
//! - **Concurrent downloads**: fixed-width worker pool over a shared task queue
//! - **Retry logic**: network errors, 5xx and 429 responses retried with exponential backoff
//! - **Per-mod failures**: a failed mod is recorded in the summary and the run continues
//! - **Overrides**: the archive's overrides tree is extracted after all downloads finish
//! - **Cancellation**: a `CancellationToken` stops dispatch and aborts in-flight downloads
//! - **Events**: lifecycle, output, progress and completion events through a callback

pub mod downloader;
pub mod error;
pub mod manifest;
pub mod overrides;
pub mod unpack;

// Re-export commonly used types for convenience
pub use downloader::{
    ApiKey, CompositeEventSink, ConsoleEventSink, CurseForgeAPI, DownloadConfig,
    DownloadCoordinator, EventCallback, EventSink, IntoEventCallback, ModRepository,
    NullEventSink, OptionalModPolicy, OutputLayout, RunSummary, TaskError, UnpackEvent,
    UnpackState,
};
pub use error::{Result, UnpackError};
pub use manifest::{LoadedModpack, Manifest, ManifestLoader, ModReference};
pub use overrides::{ExtractionReport, OverrideExtractor};
pub use unpack::Unpacker;
