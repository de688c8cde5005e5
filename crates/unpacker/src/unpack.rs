//! Pipeline facade
//!
//! [`Unpacker`] sequences one run: output directory setup, the download
//! phase, optional override extraction and the terminal `finished` event.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::downloader::api::{ApiKey, CurseForgeAPI, ModRepository};
use crate::downloader::config::DownloadConfig;
use crate::downloader::coordinator::{DownloadCoordinator, OutputLayout};
use crate::downloader::core::{EventCallback, EventEmitter, UnpackState};
use crate::downloader::summary::RunSummary;
use crate::error::{Result, UnpackError};
use crate::manifest::{LoadedModpack, ManifestLoader};
use crate::overrides::OverrideExtractor;

/// Unpacks CurseForge modpacks
///
/// The cancellation token is shared by every run started from this value;
/// once cancelled it stays cancelled.
pub struct Unpacker {
    config: DownloadConfig,
    repository: Arc<dyn ModRepository>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Unpacker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unpacker")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Unpacker {
    /// Create an unpacker backed by the CurseForge API
    pub fn new(config: DownloadConfig, api_key: ApiKey) -> Result<Self> {
        let api = CurseForgeAPI::new(api_key, &config)?;
        Ok(Self::with_repository(config, Arc::new(api)))
    }

    pub fn with_repository(config: DownloadConfig, repository: Arc<dyn ModRepository>) -> Self {
        Self {
            config,
            repository,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Open an archive and decode its manifest on the blocking pool
    pub async fn load_manifest<P: AsRef<Path>>(path: P) -> Result<LoadedModpack> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || ManifestLoader::load(path)).await?
    }

    /// `"Info: <name> - <version>"` for an archive, without downloading anything
    pub async fn verify<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || ManifestLoader::verify(path)).await?
    }

    /// Download every mod of `loaded` into `output_dir`
    ///
    /// Errors returned before the first event mean nothing was dispatched.
    /// Once the download phase starts, exactly one `Finished` event is
    /// emitted: `true` when the pipeline ran to the end (individual mods may
    /// still have failed), `false` when it was cancelled or aborted.
    pub async fn run(
        &self,
        loaded: LoadedModpack,
        output_dir: &Path,
        include_overrides: bool,
        callback: EventCallback,
    ) -> Result<RunSummary> {
        let (manifest, archive) = loaded.into_parts();
        let layout = OutputLayout::for_overrides(include_overrides);

        create_output_dir(output_dir).await?;
        create_output_dir(&layout.mods_dir(output_dir)).await?;

        let events = EventEmitter::new(callback);
        events.state(UnpackState::Downloading);
        events.output(format!("Modpack Name: {}", manifest.name));
        events.output(format!("Modpack Version: {}", manifest.version));
        events.output(format!("Modpack Author: {}", manifest.author));
        if layout == OutputLayout::ModsFolder {
            events.output("Creating mods folder");
        }
        events.output(if include_overrides {
            "Including overrides"
        } else {
            "Not including overrides"
        });

        let coordinator = DownloadCoordinator::new(self.repository.clone(), self.config.clone())
            .with_events(events.clone())
            .with_cancellation(self.cancel.clone());

        let mut summary = match coordinator.run(&manifest.files, output_dir, layout).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Download phase aborted: {}", e);
                events.finished(false);
                return Err(e);
            }
        };

        info!(
            "Downloaded {} of {} mods ({} failed, {} skipped)",
            summary.succeeded, summary.total, summary.failed, summary.skipped
        );

        if summary.cancelled {
            events.output("Unpacking cancelled");
            events.state(UnpackState::Cancelled);
            events.finished(false);
            return Ok(summary);
        }

        if include_overrides {
            events.state(UnpackState::UnpackingOverrides);
            events.output("Unpacking overrides...");

            let extractor = OverrideExtractor::new(manifest.overrides_root(), output_dir)
                .with_events(events.clone());
            match extractor.extract_blocking(archive).await {
                Ok((_, report)) => summary.overrides = Some(report),
                Err(e) => {
                    warn!("Override extraction aborted: {}", e);
                    events.finished(false);
                    return Err(e);
                }
            }

            events.output("Unpacking finished!");
        }

        events.state(UnpackState::Finished);
        events.finished(true);
        Ok(summary)
    }
}

async fn create_output_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| UnpackError::OutputDirectory {
            path: PathBuf::from(path),
            source,
        })
}
