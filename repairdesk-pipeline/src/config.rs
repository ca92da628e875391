//! Layered configuration using Figment
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//! 1. Default values (hardcoded)
//! 2. `repairdesk.toml`, `repairdesk.yaml`, `repairdesk.json` in the search directory,
//!    or one explicit file
//! 3. Environment variables prefixed `REPAIRDESK_`, with `__` separating nested keys
//!    (e.g. `REPAIRDESK_BACKEND__BASE_URL`)

use crate::error::{PipelineError, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "REPAIRDESK_";

/// File stem looked up in the search directory
pub const CONFIG_FILE_STEM: &str = "repairdesk";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub backend: BackendConfig,
    pub sync: SyncConfig,
}

/// Where and how to reach the REST backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL the lead endpoints hang off, e.g. `https://shop.example.com/api`
    pub base_url: String,
    /// Bearer token sent with every request
    pub api_token: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            api_token: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Sync coordinator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pending commands the coordinator will queue before callers wait
    pub queue_capacity: usize,
    /// Buffered notices per subscriber before the slowest one lags
    pub notice_capacity: usize,
    /// Treat a remote update slower than this as failed
    pub remote_timeout_ms: Option<u64>,
    /// Re-fetch the whole board when the local copy is found inconsistent
    pub resync_on_inconsistency: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            notice_capacity: 32,
            remote_timeout_ms: None,
            resync_on_inconsistency: true,
        }
    }
}

impl SyncConfig {
    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote_timeout_ms.map(Duration::from_millis)
    }
}

impl PipelineConfig {
    /// Load configuration using the current directory as the search directory
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| PipelineError::config(format!("cannot read current directory: {e}")))?;
        Self::load_from_dir(&cwd)
    }

    /// Load configuration, looking for `repairdesk.{toml,yaml,json}` in `dir`
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        debug!(dir = %dir.display(), "loading pipeline configuration");

        let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));
        for (ext, _) in FORMATS {
            let path = dir.join(format!("{CONFIG_FILE_STEM}.{ext}"));
            if path.is_file() {
                trace!(path = %path.display(), "merging config file");
                figment = figment.merge(file_provider(&path)?);
            }
        }

        Self::extract(figment.merge(env_provider()))
    }

    /// Load configuration from one explicit file (plus defaults and environment)
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let figment = Figment::from(Serialized::defaults(PipelineConfig::default()))
            .merge(file_provider(path)?)
            .merge(env_provider());
        Self::extract(figment)
    }

    /// Check values serde cannot constrain
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(PipelineError::config("backend.base_url must not be empty"));
        }
        url::Url::parse(&self.backend.base_url).map_err(|e| {
            PipelineError::config(format!(
                "backend.base_url '{}' is not a URL: {e}",
                self.backend.base_url
            ))
        })?;
        if self.sync.queue_capacity == 0 {
            return Err(PipelineError::config("sync.queue_capacity must be at least 1"));
        }
        if self.sync.notice_capacity == 0 {
            return Err(PipelineError::config("sync.notice_capacity must be at least 1"));
        }
        Ok(())
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: PipelineConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}

const FORMATS: [(&str, ConfigFormat); 4] = [
    ("toml", ConfigFormat::Toml),
    ("yaml", ConfigFormat::Yaml),
    ("yml", ConfigFormat::Yaml),
    ("json", ConfigFormat::Json),
];

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

fn file_provider(path: &Path) -> Result<Figment> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let format = FORMATS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, format)| *format)
        .ok_or_else(|| {
            PipelineError::config(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))
        })?;

    Ok(match format {
        ConfigFormat::Toml => Figment::from(Toml::file(path)),
        ConfigFormat::Yaml => Figment::from(Yaml::file(path)),
        ConfigFormat::Json => Figment::from(Json::file(path)),
    })
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_defaults_when_nothing_configured() {
        let temp = TempDir::new().unwrap();
        let config = PipelineConfig::load_from_dir(temp.path()).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(config.sync.resync_on_inconsistency);
    }

    #[test]
    #[serial]
    fn test_toml_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("repairdesk.toml"),
            r#"
[backend]
base_url = "https://shop.example.com/api"
api_token = "secret"

[sync]
remote_timeout_ms = 2500
"#,
        )
        .unwrap();

        let config = PipelineConfig::load_from_dir(temp.path()).unwrap();
        assert_eq!(config.backend.base_url, "https://shop.example.com/api");
        assert_eq!(config.backend.api_token.as_deref(), Some("secret"));
        assert_eq!(config.sync.remote_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.sync.queue_capacity, 64);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("repairdesk.yaml"),
            "backend:\n  base_url: https://file.example.com\n",
        )
        .unwrap();

        std::env::set_var("REPAIRDESK_BACKEND__BASE_URL", "https://env.example.com");
        std::env::set_var("REPAIRDESK_SYNC__QUEUE_CAPACITY", "8");
        let config = PipelineConfig::load_from_dir(temp.path());
        std::env::remove_var("REPAIRDESK_BACKEND__BASE_URL");
        std::env::remove_var("REPAIRDESK_SYNC__QUEUE_CAPACITY");

        let config = config.unwrap();
        assert_eq!(config.backend.base_url, "https://env.example.com");
        assert_eq!(config.sync.queue_capacity, 8);
    }

    #[test]
    #[serial]
    fn test_explicit_json_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.json");
        fs::write(&path, r#"{"backend": {"request_timeout_ms": 500}}"#).unwrap();

        let config = PipelineConfig::load_file(&path).unwrap();
        assert_eq!(config.backend.request_timeout(), Duration::from_millis(500));
    }

    #[test]
    #[serial]
    fn test_missing_or_unsupported_file() {
        let temp = TempDir::new().unwrap();
        assert!(PipelineConfig::load_file(&temp.path().join("absent.toml")).is_err());

        let ini = temp.path().join("repairdesk.ini");
        fs::write(&ini, "base_url=x").unwrap();
        let err = PipelineConfig::load_file(&ini).unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_validation() {
        let mut config = PipelineConfig::default();
        config.validate().unwrap();

        config.sync.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.backend.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }
}
