//! Remote mod repository access
//!
//! [`ModRepository`] is the seam between the download coordinator and the
//! network. [`CurseForgeAPI`] is the production implementation.

pub mod credentials;
pub mod curseforge_api;

pub use credentials::{ApiKey, API_KEY_ENV};
pub use curseforge_api::{CurseForgeAPI, API_KEY_HEADER};

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::downloader::core::TaskResult;
use crate::manifest::ModReference;

/// Mod metadata needed to name the output file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModInfo {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    pub slug: String,
}

/// Source of mod metadata and mod files
#[async_trait]
pub trait ModRepository: Send + Sync {
    /// Look up the human-readable identity of a mod
    async fn resolve_mod(&self, reference: &ModReference) -> TaskResult<ModInfo>;

    /// Fetch the referenced file and write it to `dest_path`, returning the byte count
    async fn download_file(&self, reference: &ModReference, dest_path: &Path) -> TaskResult<u64>;
}
