//! Harness configuration shared by every suite

use std::path::PathBuf;
use std::time::Duration;

use crate::browser::BrowserConfig;
use crate::error::{E2eError, E2eResult};
use crate::runner::RunnerConfig;
use crate::verdict::SuccessThreshold;

/// Where the platform is reachable when no override is given
pub const DEFAULT_BASE_URL: &str = "http://microservices.local:30080";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: "admin@example.com".to_string(),
            password: "admin123".to_string(),
        }
    }
}

/// Configuration for a harness run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base URL of the system under test (frontend + API gateway)
    pub base_url: String,

    /// Account used by login checks
    pub credentials: Credentials,

    /// Timeout for individual HTTP requests
    pub request_timeout: Duration,

    /// Honour HTTP(S)_PROXY from the environment
    pub use_system_proxy: bool,

    /// Runner settings for units inside a suite
    pub runner: RunnerConfig,

    /// Pause between suites when several are run
    pub suite_delay: Duration,

    /// Browser automation settings
    pub browser: BrowserConfig,

    /// Replaces every suite's own success threshold
    pub threshold_override: Option<SuccessThreshold>,

    /// Directory for JSON result files (None = don't write)
    pub output_dir: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: Credentials::default(),
            request_timeout: Duration::from_secs(10),
            use_system_proxy: true,
            runner: RunnerConfig::default(),
            suite_delay: Duration::from_secs(2),
            browser: BrowserConfig::default(),
            threshold_override: None,
            output_dir: None,
        }
    }
}

impl HarnessConfig {
    /// Normalize and check the configuration before a run
    pub fn validate(mut self) -> E2eResult<Self> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(E2eError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        self.base_url = trimmed;

        if self.credentials.email.is_empty() {
            return Err(E2eError::InvalidConfig("login email is empty".to_string()));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_platform() {
        let config = HarnessConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.credentials.email, "admin@example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.runner.inter_unit_delay, Duration::from_secs(1));
        assert_eq!(config.suite_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_validate_strips_trailing_slash() {
        let config = HarnessConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap().base_url, "http://localhost:8080");
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = HarnessConfig {
            base_url: "localhost:8080".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(E2eError::InvalidConfig(_))));
    }
}
