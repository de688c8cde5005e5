//! Modpack archive loading
//!
//! Opens the modpack ZIP, finds `manifest.json`, decodes and validates it.
//! The open archive is kept alongside the manifest so overrides can be
//! extracted later without reopening the file.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Result, UnpackError};
use crate::manifest::Manifest;

/// Name of the manifest entry at the archive root
pub const MANIFEST_ENTRY: &str = "manifest.json";

const EXPECTED_MANIFEST_TYPE: &str = "minecraftModpack";

/// An open modpack archive
pub struct ModpackArchive {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl std::fmt::Debug for ModpackArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModpackArchive")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}

impl ModpackArchive {
    /// Open `path` as a ZIP archive
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| UnpackError::NotArchive {
            path: path.clone(),
            source: ZipError::Io(e),
        })?;
        let archive = ZipArchive::new(file).map_err(|e| UnpackError::NotArchive {
            path: path.clone(),
            source: e,
        })?;

        debug!("Opened {} ({} entries)", path.display(), archive.len());
        Ok(Self { path, archive })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    pub(crate) fn zip_mut(&mut self) -> &mut ZipArchive<File> {
        &mut self.archive
    }

    /// Read and decode the manifest entry
    fn read_manifest(&mut self) -> Result<Manifest> {
        for name in self.entry_names() {
            debug!("Archive entry \"{}\"", name);
        }

        let mut contents = String::new();
        {
            let mut entry = match self.archive.by_name(MANIFEST_ENTRY) {
                Ok(entry) => entry,
                Err(ZipError::FileNotFound) => {
                    return Err(UnpackError::ManifestMissing {
                        path: self.path.clone(),
                        entry: MANIFEST_ENTRY.to_string(),
                    });
                }
                Err(e) => {
                    return Err(UnpackError::manifest_parse(
                        &self.path,
                        format!("cannot read {MANIFEST_ENTRY}: {e}"),
                    ));
                }
            };

            entry.read_to_string(&mut contents).map_err(|e| {
                UnpackError::manifest_parse(&self.path, format!("cannot read {MANIFEST_ENTRY}: {e}"))
            })?;
        }

        let manifest: Manifest = serde_json::from_str(&contents)
            .map_err(|e| UnpackError::manifest_parse(&self.path, e.to_string()))?;
        manifest
            .validate()
            .map_err(|reason| UnpackError::manifest_parse(&self.path, reason))?;

        debug!("Manifest Type: {}", manifest.manifest_type);
        debug!("Manifest Version: {}", manifest.manifest_version);
        if manifest.manifest_type != EXPECTED_MANIFEST_TYPE {
            warn!(
                "Unexpected manifest type '{}' in {}",
                manifest.manifest_type,
                self.path.display()
            );
        }

        Ok(manifest)
    }
}

/// A decoded manifest together with the archive it came from
#[derive(Debug)]
pub struct LoadedModpack {
    manifest: Manifest,
    archive: ModpackArchive,
}

impl LoadedModpack {
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn archive(&self) -> &ModpackArchive {
        &self.archive
    }

    pub fn into_parts(self) -> (Manifest, ModpackArchive) {
        (self.manifest, self.archive)
    }
}

/// Locates and decodes the manifest of a modpack archive
///
/// Loading is synchronous and never touches the network; async callers go
/// through [`Unpacker::load_manifest`](crate::Unpacker::load_manifest).
pub struct ManifestLoader;

impl ManifestLoader {
    /// Open the archive and decode its manifest
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedModpack> {
        let mut archive = ModpackArchive::open(path)?;
        let manifest = archive.read_manifest()?;
        Ok(LoadedModpack { manifest, archive })
    }

    /// Produce a one-line summary of the modpack without side effects
    pub fn verify<P: AsRef<Path>>(path: P) -> Result<String> {
        let loaded = Self::load(path)?;
        Ok(loaded.manifest.summary_line())
    }
}
