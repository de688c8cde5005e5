//! Override tree extraction
//!
//! Copies every archive entry under the manifest's overrides folder into the
//! output directory with that leading folder stripped, so
//! `overrides/config/options.txt` lands at `<output>/config/options.txt`.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::downloader::core::EventEmitter;
use crate::error::Result;
use crate::manifest::ModpackArchive;

/// Counts from one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub extracted: usize,
    pub directories: usize,
    /// Entries that could not be written
    pub failed: usize,
    /// Entries whose path would leave the output directory
    pub skipped: usize,
}

/// Extracts the overrides subtree of a modpack archive
#[derive(Debug, Clone)]
pub struct OverrideExtractor {
    root: PathBuf,
    output_dir: PathBuf,
    events: EventEmitter,
}

impl OverrideExtractor {
    pub fn new<P: Into<PathBuf>>(root: &str, output_dir: P) -> Self {
        Self {
            root: Path::new(root)
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .collect(),
            output_dir: output_dir.into(),
            events: EventEmitter::default(),
        }
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Run [`extract`](Self::extract) on the blocking pool, handing the archive back
    pub async fn extract_blocking(
        self,
        mut archive: ModpackArchive,
    ) -> Result<(ModpackArchive, ExtractionReport)> {
        let handle = tokio::task::spawn_blocking(move || {
            let report = self.extract(&mut archive);
            (archive, report)
        });
        Ok(handle.await?)
    }

    /// Copy every entry under the overrides root into the output directory
    ///
    /// Failures are per entry: they are reported through the event emitter
    /// and counted, and extraction carries on with the next entry.
    pub fn extract(&self, archive: &mut ModpackArchive) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        let raw_prefix = format!("{}/", self.root.display()).replace('\\', "/");
        let zip = archive.zip_mut();

        for index in 0..zip.len() {
            let mut entry = match zip.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read archive entry {}: {}", index, e);
                    self.events
                        .output(format!("Error: cannot read archive entry {}: {}", index, e));
                    report.failed += 1;
                    continue;
                }
            };

            let Some(enclosed) = entry.enclosed_name() else {
                if entry.name().starts_with(&raw_prefix) {
                    warn!("Skipping unsafe override entry \"{}\"", entry.name());
                    report.skipped += 1;
                }
                continue;
            };

            let Ok(relative) = enclosed.strip_prefix(&self.root) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            if relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
            {
                warn!("Skipping unsafe override entry \"{}\"", entry.name());
                report.skipped += 1;
                continue;
            }

            let destination = self.destination_for(relative);

            if entry.is_dir() {
                match fs::create_dir_all(&destination) {
                    Ok(()) => report.directories += 1,
                    Err(e) => {
                        self.report_failure(relative, &e);
                        report.failed += 1;
                    }
                }
                continue;
            }

            match write_entry(&mut entry, &destination) {
                Ok(bytes) => {
                    debug!("Extracted {} ({} bytes)", destination.display(), bytes);
                    self.events
                        .output(format!("Unzipped: {}", relative.display()));
                    report.extracted += 1;
                }
                Err(e) => {
                    self.report_failure(relative, &e);
                    let _ = fs::remove_file(&destination);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Overrides: {} files, {} directories, {} failed, {} skipped",
            report.extracted, report.directories, report.failed, report.skipped
        );
        report
    }

    fn destination_for(&self, relative: &Path) -> PathBuf {
        let mut destination = self.output_dir.clone();
        for component in relative.components() {
            if let Component::Normal(part) = component {
                destination.push(part);
            }
        }
        destination
    }

    fn report_failure(&self, relative: &Path, error: &io::Error) {
        warn!("Failed to extract {}: {}", relative.display(), error);
        self.events
            .output(format!("Error: failed to extract {}: {}", relative.display(), error));
    }
}

fn write_entry<R: io::Read>(entry: &mut R, destination: &Path) -> io::Result<u64> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(destination)?;
    io::copy(entry, &mut file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::testing::EventLog;
    use crate::manifest::loader::test_support::write_archive;
    use tempfile::tempdir;

    fn open(entries: &[(&str, &str)]) -> (tempfile::TempDir, ModpackArchive) {
        let dir = tempdir().unwrap();
        let path = write_archive(dir.path(), "pack.zip", entries);
        let archive = ModpackArchive::open(path).unwrap();
        (dir, archive)
    }

    #[test]
    fn test_extracts_nested_files_with_prefix_stripped() {
        let (_dir, mut archive) = open(&[
            ("manifest.json", "{}"),
            ("overrides/", ""),
            ("overrides/config/", ""),
            ("overrides/config/options.txt", "fov:90\n"),
            ("overrides/scripts/deep/start.zs", "print('hi');"),
            ("other/readme.txt", "ignored"),
        ]);
        let out = tempdir().unwrap();
        let log = EventLog::new();

        let report = OverrideExtractor::new("overrides", out.path())
            .with_events(log.emitter())
            .extract(&mut archive);

        assert_eq!(report.extracted, 2);
        assert_eq!(report.directories, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(
            fs::read(out.path().join("config").join("options.txt")).unwrap(),
            b"fov:90\n"
        );
        assert!(out.path().join("scripts").join("deep").join("start.zs").is_file());
        assert!(!out.path().join("readme.txt").exists());
        assert!(!out.path().join("other").exists());
        assert!(!out.path().join("manifest.json").exists());
        assert_eq!(
            log.outputs().iter().filter(|l| l.starts_with("Unzipped: ")).count(),
            2
        );
    }

    #[test]
    fn test_custom_root_and_similar_prefix() {
        let (_dir, mut archive) = open(&[
            ("client/options.txt", "a"),
            ("client-extra/options.txt", "b"),
        ]);
        let out = tempdir().unwrap();

        let report = OverrideExtractor::new("./client/", out.path()).extract(&mut archive);

        assert_eq!(report.extracted, 1);
        assert_eq!(fs::read(out.path().join("options.txt")).unwrap(), b"a");
    }

    #[test]
    fn test_existing_directories_are_tolerated() {
        let (_dir, mut archive) = open(&[("overrides/config/a.txt", "new")]);
        let out = tempdir().unwrap();
        fs::create_dir_all(out.path().join("config")).unwrap();
        fs::write(out.path().join("config").join("a.txt"), b"old contents").unwrap();

        let report = OverrideExtractor::new("overrides", out.path()).extract(&mut archive);

        assert_eq!(report.extracted, 1);
        assert_eq!(fs::read(out.path().join("config").join("a.txt")).unwrap(), b"new");
    }

    #[test]
    fn test_write_failure_does_not_stop_extraction() {
        let (_dir, mut archive) = open(&[
            ("overrides/blocked/file.txt", "x"),
            ("overrides/fine.txt", "y"),
        ]);
        let out = tempdir().unwrap();
        // A plain file where a directory is needed
        fs::write(out.path().join("blocked"), b"").unwrap();
        let log = EventLog::new();

        let report = OverrideExtractor::new("overrides", out.path())
            .with_events(log.emitter())
            .extract(&mut archive);

        assert_eq!(report.failed, 1);
        assert_eq!(report.extracted, 1);
        assert!(out.path().join("fine.txt").is_file());
        assert!(log.outputs().iter().any(|l| l.starts_with("Error: failed to extract")));
    }

    #[test]
    fn test_unsafe_entries_are_skipped() {
        let (_dir, mut archive) = open(&[
            ("overrides/../../escape.txt", "bad"),
            ("overrides/../sibling.txt", "bad"),
            ("overrides/ok.txt", "good"),
        ]);
        let parent = tempdir().unwrap();
        let out = parent.path().join("out");

        let report = OverrideExtractor::new("overrides", &out).extract(&mut archive);

        assert_eq!(report.extracted, 1);
        assert_eq!(report.skipped, 2);
        assert!(!parent.path().join("escape.txt").exists());
        assert!(!out.join("sibling.txt").exists());
        assert!(out.join("ok.txt").is_file());
    }

    #[tokio::test]
    async fn test_extract_blocking_returns_archive() {
        let (_dir, archive) = open(&[("overrides/a.txt", "a")]);
        let out = tempdir().unwrap();

        let (archive, report) = OverrideExtractor::new("overrides", out.path())
            .extract_blocking(archive)
            .await
            .unwrap();

        assert_eq!(report.extracted, 1);
        assert_eq!(archive.len(), 1);
    }
}
