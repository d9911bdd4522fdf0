//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use formdesk_auth::Endpoints;
use formdesk_core::{BrowserConfig, DEFAULT_EXPORT_FILE, RetryPolicy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable overriding [`IdentityConfig::api_key`].
pub const API_KEY_ENV: &str = "FORMDESK_API_KEY";
/// Environment variable overriding [`AppConfig::database_path`].
pub const DATABASE_ENV: &str = "FORMDESK_DATABASE";

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Project API key.
    pub api_key: String,
    /// Accounts API base URL.
    pub auth_endpoint: String,
    /// Refresh-token exchange URL.
    pub token_endpoint: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auth_endpoint: "https://identitytoolkit.googleapis.com/v1/".to_string(),
            token_endpoint: "https://securetoken.googleapis.com/v1/token".to_string(),
        }
    }
}

/// Settings that persist across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `SQLite` database holding submissions.
    pub database_path: PathBuf,
    /// Identity provider settings.
    pub identity: IdentityConfig,
    /// Bound on a single page fetch, in seconds. Zero counts as one.
    pub fetch_timeout_secs: u64,
    /// Bound on a single identity provider request, in seconds. Zero counts
    /// as one.
    pub auth_timeout_secs: u64,
    /// Retry policy for page fetches.
    pub retry: RetryPolicy,
    /// Default target of `export`.
    pub export_path: PathBuf,
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("formdesk")
                .join("submissions.db"),
            identity: IdentityConfig::default(),
            fetch_timeout_secs: 10,
            auth_timeout_secs: 10,
            retry: RetryPolicy::default(),
            export_path: PathBuf::from(DEFAULT_EXPORT_FILE),
            log_filter: None,
        }
    }
}

impl AppConfig {
    /// `<config dir>/formdesk/config.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("formdesk")
            .join("config.json")
    }

    /// Loads the config file with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> anyhow::Result<Self> {
        let config = Self::load_from(&Self::default_path()).await?;
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Loads a config file, falling back to defaults when it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Saves the config as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        info!("Config saved to {}", path.display());
        Ok(())
    }

    /// Applies `FORMDESK_*` overrides read through `lookup`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.identity.api_key = key;
        }
        if let Some(path) = lookup(DATABASE_ENV).filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        self
    }

    /// Page loading settings.
    #[must_use]
    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs.max(1)),
            retry: self.retry,
        }
    }

    /// Per-request timeout for the identity provider.
    #[must_use]
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs.max(1))
    }

    /// Identity provider endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint is not a valid HTTP URL.
    pub fn endpoints(&self) -> formdesk_auth::Result<Endpoints> {
        let endpoints =
            Endpoints::new(&self.identity.auth_endpoint, &self.identity.token_endpoint)?;
        endpoints.validate()?;
        Ok(endpoints)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("formdesk-config-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.auth_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.export_path, PathBuf::from("submissions.csv"));
        assert!(config.database_path.ends_with("formdesk/submissions.db"));
        assert_eq!(
            config.browser_config().fetch_timeout,
            Duration::from_secs(10)
        );
        config.endpoints().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"identity": {"api_key": "abc"}, "retry": {"max_attempts": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.identity.api_key, "abc");
        assert!(config.identity.auth_endpoint.starts_with("https://"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 200);
        assert_eq!(config.fetch_timeout_secs, 10);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::default().with_overrides(|name| match name {
            API_KEY_ENV => Some("from-env".to_string()),
            DATABASE_ENV => Some("/tmp/other.db".to_string()),
            _ => None,
        });
        assert_eq!(config.identity.api_key, "from-env");
        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));

        let unchanged = AppConfig::default().with_overrides(|_| Some(String::new()));
        assert_eq!(unchanged, AppConfig::default());
    }

    #[test]
    fn test_zero_timeouts_are_raised_to_one_second() {
        let config: AppConfig =
            serde_json::from_str(r#"{"fetch_timeout_secs": 0, "auth_timeout_secs": 0}"#).unwrap();
        assert_eq!(config.browser_config().fetch_timeout, Duration::from_secs(1));
        assert_eq!(config.auth_timeout(), Duration::from_secs(1));

        let config: AppConfig = serde_json::from_str(r#"{"auth_timeout_secs": 3}"#).unwrap();
        assert_eq!(config.auth_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_bad_endpoint() {
        let mut config = AppConfig::default();
        config.identity.auth_endpoint = "not a url".to_string();
        assert!(config.endpoints().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let path = scratch_dir("missing").join("config.json");
        assert_eq!(AppConfig::load_from(&path).await.unwrap(), AppConfig::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = scratch_dir("save");
        let path = dir.join("config.json");

        let mut config = AppConfig::default();
        config.identity.api_key = "saved".to_string();
        config.log_filter = Some("formdesk=debug".to_string());
        config.save_to(&path).await.unwrap();

        let loaded = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);

        tokio::fs::write(&path, "{not json").await.unwrap();
        assert!(AppConfig::load_from(&path).await.is_err());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
