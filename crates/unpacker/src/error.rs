//! Run-fatal error types
//!
//! Everything in here aborts a run before the first event is emitted. Failures
//! that only affect a single mod are [`TaskError`](crate::downloader::TaskError)s
//! and end up in the run summary instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent an unpack run from starting
#[derive(Error, Debug)]
pub enum UnpackError {
    /// The modpack file could not be opened or is not a ZIP archive
    #[error("'{path}' is not a readable modpack archive")]
    NotArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// The archive does not contain the manifest entry
    #[error("'{path}' does not contain '{entry}'")]
    ManifestMissing {
        path: PathBuf,
        entry: String,
    },

    /// The manifest entry exists but is malformed
    #[error("Manifest in '{path}' is invalid: {reason}")]
    ManifestParse {
        path: PathBuf,
        reason: String,
    },

    /// The output directory root could not be created
    #[error("Cannot create output directory '{path}'")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid downloader configuration or missing credentials
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        suggestion: Option<String>,
    },

    /// A blocking archive task panicked or was aborted
    #[error("Background archive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, UnpackError>;

impl UnpackError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            UnpackError::NotArchive { .. } => "not_archive",
            UnpackError::ManifestMissing { .. } => "manifest_missing",
            UnpackError::ManifestParse { .. } => "manifest_parse",
            UnpackError::OutputDirectory { .. } => "output_directory",
            UnpackError::Configuration { .. } => "configuration",
            UnpackError::Join(_) => "join",
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            UnpackError::NotArchive { .. } => Some("Select a CurseForge modpack .zip file"),
            UnpackError::ManifestMissing { .. } => {
                Some("The archive is not a CurseForge modpack export")
            }
            UnpackError::OutputDirectory { .. } => {
                Some("Check that the output location is writable")
            }
            UnpackError::Configuration { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn manifest_parse<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        UnpackError::ManifestParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn configuration<S: Into<String>>(message: S, field: &str, suggestion: &str) -> Self {
        UnpackError::Configuration {
            message: message.into(),
            field: Some(field.to_string()),
            suggestion: Some(suggestion.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_suggestion() {
        let err = UnpackError::ManifestMissing {
            path: PathBuf::from("pack.zip"),
            entry: "manifest.json".to_string(),
        };
        assert_eq!(err.category(), "manifest_missing");
        assert!(err.suggestion().is_some());
        assert_eq!(err.to_string(), "'pack.zip' does not contain 'manifest.json'");

        let err = UnpackError::configuration("no key", "api_key", "set CURSEFORGE_API_KEY");
        assert_eq!(err.category(), "configuration");
        assert_eq!(err.suggestion(), Some("set CURSEFORGE_API_KEY"));
    }
}
