use crate::error::AppError;
use crate::scheduler::DEFAULT_TICK_INTERVAL;
use crate::task_store::{DEFAULT_PAGE_SIZE, DEFAULT_REMOTE_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "RECUR_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub collection_name: String,
    pub page_size: u32,
    pub tick_interval_ms: u64,
    pub remote_timeout_secs: u64,
    pub public_url: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            collection_name: "tasks".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            tick_interval_ms: DEFAULT_TICK_INTERVAL.as_millis() as u64,
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT.as_secs(),
            public_url: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub collection_name: Option<String>,
    pub page_size: Option<u32>,
    pub tick_interval_ms: Option<u64>,
    pub remote_timeout_secs: Option<u64>,
    pub public_url: Option<String>,
    pub log_level: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("recur").join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("recur")
            .join(CONFIG_FILE_NAME))
    }
}

/// Never fails: a missing file yields defaults, a broken one yields
/// defaults plus the error so the caller can report it.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), AppError> {
    if config.base_url.trim().is_empty() {
        return Err(AppError::invalid_data("base_url must not be empty"));
    }
    if config.collection_name.trim().is_empty() {
        return Err(AppError::invalid_data("collection_name must not be empty"));
    }
    if config.page_size == 0 {
        return Err(AppError::invalid_data("page_size must be positive"));
    }
    Ok(())
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(base_url) = overrides.base_url.as_ref() {
        merged.base_url = base_url.clone();
    }
    if let Some(collection_name) = overrides.collection_name.as_ref() {
        merged.collection_name = collection_name.clone();
    }
    if let Some(page_size) = overrides.page_size {
        merged.page_size = page_size.max(1);
    }
    if let Some(tick_interval_ms) = overrides.tick_interval_ms {
        merged.tick_interval_ms = tick_interval_ms;
    }
    if let Some(remote_timeout_secs) = overrides.remote_timeout_secs {
        merged.remote_timeout_secs = remote_timeout_secs;
    }
    if let Some(public_url) = overrides.public_url.as_ref() {
        merged.public_url = (!public_url.trim().is_empty()).then(|| public_url.clone());
    }
    if let Some(log_level) = overrides.log_level.as_ref() {
        merged.log_level = log_level.clone();
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, load_config_from_path, load_config_with_fallback_from_path,
        merge_overrides,
    };
    use std::fs;
    use std::time::Duration;

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_with_fallback_from_path(&dir.path().join("missing.json"));

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn load_config_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        let content = serde_json::json!({
            "base_url": "https://pb.example.com",
            "tick_interval_ms": 250
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();

        assert_eq!(loaded.base_url, "https://pb.example.com");
        assert_eq!(loaded.tick_interval(), Duration::from_millis(250));
        assert_eq!(loaded.collection_name, "tasks");
        assert_eq!(loaded.page_size, 200);
        assert_eq!(loaded.remote_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn load_config_rejects_zero_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.json");
        fs::write(&path, r#"{"page_size": 0}"#).unwrap();

        assert_eq!(load_config_from_path(&path).unwrap_err().code(), "invalid_data");
    }

    #[test]
    fn merge_overrides_replaces_only_given_fields() {
        let base = Config::default();
        let overrides = ConfigOverrides {
            base_url: Some("http://10.0.0.2:8090".into()),
            remote_timeout_secs: Some(3),
            public_url: Some("https://todo.example.com".into()),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.base_url, "http://10.0.0.2:8090");
        assert_eq!(merged.remote_timeout(), Duration::from_secs(3));
        assert_eq!(merged.public_url.as_deref(), Some("https://todo.example.com"));
        assert_eq!(merged.collection_name, base.collection_name);
        assert_eq!(base.public_url, None);
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            log_level: "debug".into(),
            ..Config::default()
        };

        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }

    #[test]
    fn durations_never_collapse_to_zero() {
        let config = Config {
            tick_interval_ms: 0,
            remote_timeout_secs: 0,
            ..Config::default()
        };

        assert_eq!(config.tick_interval(), Duration::from_millis(1));
        assert_eq!(config.remote_timeout(), Duration::from_secs(1));
    }
}
