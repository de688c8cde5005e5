//! API key resolution
//!
//! The key is never compiled in. It comes from an explicit value, a secrets
//! JSON file, or the `CURSEFORGE_API_KEY` environment variable (a `.env` file
//! is loaded first if present).

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, UnpackError};

/// Environment variable holding the CurseForge API key
pub const API_KEY_ENV: &str = "CURSEFORGE_API_KEY";

#[derive(Deserialize)]
struct SecretsFile {
    api_key: String,
}

/// CurseForge API key; `Debug` output is redacted
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl ApiKey {
    pub fn new<S: Into<String>>(key: S) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(UnpackError::configuration(
                "API key is empty",
                "api_key",
                "Pass a non-empty CurseForge API key",
            ));
        }
        Ok(Self(key))
    }

    /// Read the key from the environment, loading `.env` if present
    pub fn from_env() -> Result<Self> {
        if dotenv::dotenv().is_ok() {
            debug!("Loaded environment variables from .env file");
        }

        let key = std::env::var(API_KEY_ENV).map_err(|_| UnpackError::Configuration {
            message: format!("{API_KEY_ENV} environment variable not set"),
            field: Some(API_KEY_ENV.to_string()),
            suggestion: Some(format!(
                "Set {API_KEY_ENV} in your .env file with your CurseForge API key"
            )),
        })?;
        Self::new(key)
    }

    /// Read the key from a JSON file of the form `{"api_key": "..."}`
    pub fn from_secrets_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UnpackError::configuration(
                format!("Cannot read secrets file '{}': {}", path.display(), e),
                "secrets",
                "Check the secrets file path",
            )
        })?;
        let secrets: SecretsFile = serde_json::from_str(&contents).map_err(|e| {
            UnpackError::configuration(
                format!("Secrets file '{}' is invalid: {}", path.display(), e),
                "secrets",
                "The file must look like {\"api_key\": \"...\"}",
            )
        })?;
        Self::new(secrets.api_key)
    }

    /// Resolve the key: explicit value, then secrets file, then environment
    pub fn resolve(explicit: Option<String>, secrets_file: Option<&Path>) -> Result<Self> {
        if let Some(key) = explicit {
            return Self::new(key);
        }
        if let Some(path) = secrets_file {
            return Self::from_secrets_file(path);
        }
        Self::from_env()
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}
