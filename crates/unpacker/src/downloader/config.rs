//! Configuration types for the downloader

use std::time::Duration;
use url::Url;

use crate::error::{Result, UnpackError};

/// Default CurseForge API host
pub const DEFAULT_API_BASE: &str = "https://api.curseforge.com";
/// Default base for file download endpoints
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://www.curseforge.com/api/v1";
/// Default worker pool width
pub const DEFAULT_WORKERS: usize = 8;

/// What to do with manifest entries marked `required: false`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionalModPolicy {
    /// Treat optional mods like required ones
    #[default]
    Download,
    /// Record optional mods as skipped without contacting the API
    Skip,
}

/// Configuration for download operations
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Number of concurrent download workers
    pub max_workers: usize,
    /// Deadline for a metadata request, body included
    pub timeout: Duration,
    /// Deadline for a mod file download, body included
    pub download_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Retry attempts for network errors, 5xx and 429 responses
    pub max_retries: usize,
    /// Initial delay between retries (doubles each retry)
    pub retry_delay: Duration,
    /// Maximum retry delay cap
    pub max_retry_delay: Duration,
    pub api_base: String,
    pub download_base: String,
    pub optional_mods: OptionalModPolicy,
}

impl DownloadConfig {
    pub fn builder() -> DownloadConfigBuilder {
        DownloadConfigBuilder::new()
    }

    /// Retry delays, in order, for the configured number of retries
    pub fn retry_delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let base = (self.retry_delay.as_millis() as u64 / 2).max(1);
        tokio_retry::strategy::ExponentialBackoff::from_millis(2)
            .factor(base)
            .max_delay(self.max_retry_delay)
            .take(self.max_retries)
    }

    /// Check the configuration for values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(UnpackError::configuration(
                "max_workers must be at least 1",
                "max_workers",
                "Use the default of 8 workers",
            ));
        }

        if self.timeout.is_zero()
            || self.download_timeout.is_zero()
            || self.connect_timeout.is_zero()
        {
            return Err(UnpackError::configuration(
                "timeouts must be greater than zero",
                "timeout",
                "Use a timeout of a few seconds or more",
            ));
        }

        validate_base_url(&self.api_base, "api_base")?;
        validate_base_url(&self.download_base, "download_base")?;
        Ok(())
    }
}

fn validate_base_url(value: &str, field: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| {
        UnpackError::configuration(
            format!("{field} '{value}' is not a valid URL: {e}"),
            field,
            "URL must be absolute (include http:// or https://)",
        )
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UnpackError::configuration(
            format!("{field} '{value}' must use http or https"),
            field,
            "Use a supported URL scheme (http/https)",
        ));
    }

    Ok(())
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_WORKERS,
            timeout: Duration::from_secs(30),
            // Large jars on slow links
            download_timeout: Duration::from_secs(600),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("modpack-unpacker/", env!("CARGO_PKG_VERSION")).to_string(),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(10),
            api_base: DEFAULT_API_BASE.to_string(),
            download_base: DEFAULT_DOWNLOAD_BASE.to_string(),
            optional_mods: OptionalModPolicy::Download,
        }
    }
}

/// Builder for [`DownloadConfig`]; `build` validates the result
#[derive(Debug, Clone, Default)]
pub struct DownloadConfigBuilder {
    config: DownloadConfig,
}

impl DownloadConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.config.max_workers = workers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.config.download_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn max_retry_delay(mut self, delay: Duration) -> Self {
        self.config.max_retry_delay = delay;
        self
    }

    pub fn api_base<S: Into<String>>(mut self, base: S) -> Self {
        self.config.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn download_base<S: Into<String>>(mut self, base: S) -> Self {
        self.config.download_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn optional_mods(mut self, policy: OptionalModPolicy) -> Self {
        self.config.optional_mods = policy;
        self
    }

    pub fn build(self) -> Result<DownloadConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DownloadConfig::default();
        assert_eq!(config.max_workers, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_zero_workers() {
        let result = DownloadConfig::builder().max_workers(0).build();
        match result {
            Err(UnpackError::Configuration { field, .. }) => {
                assert_eq!(field.as_deref(), Some("max_workers"))
            }
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_download_deadline_outlasts_metadata_deadline() {
        let config = DownloadConfig::default();
        assert!(config.download_timeout > config.timeout);

        let result = DownloadConfig::builder()
            .download_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(UnpackError::Configuration { .. })));
    }

    #[test]
    fn test_builder_rejects_bad_base_url() {
        assert!(DownloadConfig::builder().api_base("not a url").build().is_err());
        assert!(DownloadConfig::builder().download_base("ftp://host/api").build().is_err());
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let config = DownloadConfig::builder()
            .api_base("http://127.0.0.1:9000/")
            .build()
            .unwrap();
        assert_eq!(config.api_base, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_retry_delays_grow_and_cap() {
        let config = DownloadConfig::builder()
            .max_retries(5)
            .retry_delay(Duration::from_millis(500))
            .max_retry_delay(Duration::from_secs(2))
            .build()
            .unwrap();

        let delays: Vec<Duration> = config.retry_delays().collect();
        assert_eq!(delays.len(), 5);
        assert_eq!(delays[0], Duration::from_millis(500));
        assert_eq!(delays[1], Duration::from_millis(1000));
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(2)));
    }
}
