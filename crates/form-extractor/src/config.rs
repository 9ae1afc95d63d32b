//! Extraction settings and their resolution.

use std::time::Duration;

/// Default bound on download, navigation and page-load waits.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of acquire-extract-release attempts a caller should make.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub const TIMEOUT_ENV: &str = "FORM_EXTRACTOR_TIMEOUT_SECS";
pub const MAX_ATTEMPTS_ENV: &str = "FORM_EXTRACTOR_MAX_ATTEMPTS";

/// Settings shared by every extraction an `Extractor` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ExtractorConfig {
    /// Defaults overlaid with `FORM_EXTRACTOR_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config = config.with_timeout(Duration::from_secs(secs)),
                Err(_) => tracing::warn!("ignoring {TIMEOUT_ENV}={raw}: not a number of seconds"),
            }
        }

        if let Some(raw) = lookup(MAX_ATTEMPTS_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(n) => config = config.with_max_attempts(n),
                Err(_) => tracing::warn!("ignoring {MAX_ATTEMPTS_ENV}={raw}: not a count"),
            }
        }

        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt ceiling; zero is raised to one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }
}
