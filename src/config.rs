use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;

pub const DEFAULT_RESOLVER_URL: &str = "https://locate.ncbi.nlm.nih.gov/sdl/2/retrieve";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub resolver_url: Option<String>,
    #[serde(default)]
    pub tool_directory: Option<PathBuf>,
    #[serde(default)]
    pub remote_disabled: Option<bool>,
    #[serde(default)]
    pub ce_token: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub resolver_url: String,
    pub tool_directory: Option<PathBuf>,
    pub remote_disabled: bool,
    pub ce_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            tool_directory: None,
            remote_disabled: false,
            ce_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` if given (it must exist), otherwise the per-user
    /// `sratools/config.json` when present, otherwise the defaults.
    pub fn resolve(path: Option<&str>) -> Result<DriverConfig, DriverError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(DriverConfig::default()),
            },
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DriverError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DriverError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> DriverConfig {
        let defaults = DriverConfig::default();
        DriverConfig {
            resolver_url: config
                .resolver_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.resolver_url),
            tool_directory: config.tool_directory,
            remote_disabled: config.remote_disabled.unwrap_or(false),
            ce_token: config.ce_token.filter(|token| !token.trim().is_empty()),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("sratools").join("config.json"))
}
