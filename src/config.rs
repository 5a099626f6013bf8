//! Client configuration resolved from explicit values and the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DriveError, Result};

/// Environment variable holding the service account credentials path.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment variable holding the folder every operation is scoped to.
pub const ROOT_FOLDER_ENV: &str = "GOOGLE_DRIVE_ROOT_FOLDER_ID";

/// Environment variable enabling shared drive support.
pub const SUPPORTS_ALL_DRIVES_ENV: &str = "GOOGLE_DRIVE_SUPPORTS_ALL_DRIVES";

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Resolved, immutable client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
    credentials_path: PathBuf,
    root_folder_id: Option<String>,
    supports_all_drives: bool,
    max_retries: u32,
    retry_delay: Duration,
}

impl DriveConfig {
    /// Start building a configuration. Unset values fall back to the environment.
    pub fn builder() -> DriveConfigBuilder {
        DriveConfigBuilder::default()
    }

    /// Resolve a configuration purely from the environment.
    pub fn from_env() -> Result<Self> {
        Self::builder().resolve()
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn root_folder_id(&self) -> Option<&str> {
        self.root_folder_id.as_deref()
    }

    pub fn supports_all_drives(&self) -> bool {
        self.supports_all_drives
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

/// Explicit configuration values. Each one takes precedence over its
/// environment fallback.
#[derive(Debug, Clone, Default)]
pub struct DriveConfigBuilder {
    credentials_path: Option<PathBuf>,
    root_folder_id: Option<String>,
    supports_all_drives: Option<bool>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
}

impl DriveConfigBuilder {
    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn root_folder_id(mut self, id: impl Into<String>) -> Self {
        self.root_folder_id = Some(id.into());
        self
    }

    pub fn supports_all_drives(mut self, enabled: bool) -> Self {
        self.supports_all_drives = Some(enabled);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = Some(delay_ms);
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(self) -> Result<DriveConfig> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with<F>(self, env: F) -> Result<DriveConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials_path = self
            .credentials_path
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| non_empty(env(CREDENTIALS_ENV)).map(PathBuf::from))
            .ok_or_else(|| {
                DriveError::Configuration(format!("Missing {} path.", CREDENTIALS_ENV))
            })?;

        let root_folder_id =
            non_empty(self.root_folder_id).or_else(|| non_empty(env(ROOT_FOLDER_ENV)));

        let supports_all_drives = self.supports_all_drives.unwrap_or_else(|| {
            env(SUPPORTS_ALL_DRIVES_ENV)
                .map(|v| parse_truthy(&v))
                .unwrap_or(false)
        });

        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries == 0 {
            return Err(DriveError::Configuration(
                "max_retries must be at least 1".to_string(),
            ));
        }

        Ok(DriveConfig {
            credentials_path,
            root_folder_id,
            supports_all_drives,
            max_retries,
            retry_delay: Duration::from_millis(
                self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            ),
        })
    }
}

/// Case-insensitive truthiness: only `1` and `true` count.
pub fn parse_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
