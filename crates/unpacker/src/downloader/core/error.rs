//! Per-task error types for the download pipeline
//!
//! A `TaskError` never aborts a run: the coordinator records it against the
//! offending mod reference and moves on to the next task.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a single mod download can fail
#[derive(Error, Debug)]
pub enum TaskError {
    /// Transport-level failure (DNS, connect, reset, timeout)
    #[error("Request to '{url}' failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("Request to '{url}' returned HTTP {status}")]
    HttpStatus {
        url: String,
        status: u16,
    },

    /// The metadata response could not be used
    #[error("Unusable response from '{url}': {reason}")]
    InvalidResponse {
        url: String,
        reason: String,
    },

    /// File system I/O errors with file context
    #[error("Failed {operation} '{path}'")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// Another task in the same run already writes to this file
    #[error("'{path}' is already claimed by another mod in this pack")]
    DuplicateDestination { path: PathBuf },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Create,
    Write,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Write => write!(f, "writing"),
        }
    }
}

pub type TaskResult<T> = std::result::Result<T, TaskError>;

impl TaskError {
    pub(crate) fn network<S: Into<String>>(url: S, source: reqwest::Error) -> Self {
        TaskError::Network {
            url: url.into(),
            source,
        }
    }

    pub(crate) fn file_system<P: Into<PathBuf>>(
        path: P,
        operation: FileOperation,
        source: std::io::Error,
    ) -> Self {
        TaskError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Check if the request is worth repeating
    pub fn is_retryable(&self) -> bool {
        match self {
            TaskError::Network { source, .. } => !source.is_builder(),
            // Only retry on server errors and rate limiting, not client errors (4xx)
            TaskError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            TaskError::InvalidResponse { .. } => false,
            TaskError::FileSystem { .. } => false,
            TaskError::DuplicateDestination { .. } => false,
        }
    }

    /// Get error category for the run summary and logging
    pub fn category(&self) -> &'static str {
        match self {
            TaskError::Network { source, .. } if source.is_timeout() => "timeout",
            TaskError::Network { .. } => "network",
            TaskError::HttpStatus { .. } => "http_status",
            TaskError::InvalidResponse { .. } => "invalid_response",
            TaskError::FileSystem { .. } => "file_system",
            TaskError::DuplicateDestination { .. } => "duplicate_destination",
        }
    }

    /// Error message including the root cause
    pub fn detailed_message(&self) -> String {
        match std::error::Error::source(self) {
            Some(source) => format!("{}: {}", self, source),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_retry_policy() {
        let not_found = TaskError::HttpStatus { url: "u".into(), status: 404 };
        let unavailable = TaskError::HttpStatus { url: "u".into(), status: 503 };
        let throttled = TaskError::HttpStatus { url: "u".into(), status: 429 };

        assert!(!not_found.is_retryable());
        assert!(unavailable.is_retryable());
        assert!(throttled.is_retryable());
        assert_eq!(not_found.category(), "http_status");
    }

    #[test]
    fn test_file_system_message_includes_cause() {
        let err = TaskError::file_system(
            "/tmp/out/jei.jar",
            FileOperation::Create,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert!(!err.is_retryable());
        assert_eq!(err.category(), "file_system");
        let message = err.detailed_message();
        assert!(message.contains("creating"));
        assert!(message.contains("denied"));
    }
}
