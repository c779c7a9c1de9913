use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use powerguard_core::PowerGuardClient;
use serde::Deserialize;

/// Read when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "powerguard.toml";

/// Contents of the TOML config file. Every key is optional so flags and
/// environment variables can fill the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let cfg: FileConfig = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(cfg)
    }
}

/// Values given on the command line or through the environment. clap has
/// already applied flag-over-env precedence.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub config: Option<PathBuf>,
}

/// Resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub token: String,
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Load the config file (explicit path, or the default one if present)
    /// and merge the overrides on top.
    pub fn load(overrides: Overrides) -> anyhow::Result<Self> {
        let file = match overrides.config.as_deref() {
            Some(path) => FileConfig::load(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.is_file() {
                    FileConfig::load(default)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Self::merge(file, overrides)
    }

    pub fn merge(file: FileConfig, overrides: Overrides) -> anyhow::Result<Self> {
        let base_url = overrides.base_url.or(file.base_url).context(
            "no API base URL: pass --base-url, set POWERGUARD_BASE_URL or add base_url to the config file",
        )?;
        let token = overrides.token.or(file.token).context(
            "no API token: pass --token, set POWERGUARD_TOKEN or add token to the config file",
        )?;
        Ok(Self {
            base_url,
            token,
            timeout: file.timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn client(&self) -> anyhow::Result<PowerGuardClient> {
        let client = PowerGuardClient::new(&self.base_url, &self.token)
            .context("invalid API configuration")?;
        Ok(client)
    }
}
