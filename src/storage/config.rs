//! Client configuration stored in ~/.hyper/config.json

use crate::storage::paths::HyperPaths;
use crate::{HyperError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

/// Endpoint used when neither `--host` nor `HYPER_HOST` is given
pub const DEFAULT_HOST: &str = "https://us-west-1.hyper.sh";

/// Credentials for one cloud endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(rename = "accesskey")]
    pub access_key: String,
    #[serde(rename = "secretkey")]
    pub secret_key: String,
}

/// On-disk config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Credentials keyed by endpoint URL
    #[serde(default)]
    pub clouds: HashMap<String, CloudConfig>,
}

impl ConfigFile {
    /// Load the config file, returning an empty config if it does not exist
    pub fn load(paths: &HyperPaths) -> Result<Self> {
        let path = paths.config_file();
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(&path)?;
        let config: ConfigFile = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Write the config file, creating the root directory if needed
    pub fn save(&self, paths: &HyperPaths) -> Result<()> {
        paths.ensure_directories()?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(paths.config_file(), json)?;
        Ok(())
    }

    /// Store credentials for `host`
    pub fn set_cloud(&mut self, host: &str, cloud: CloudConfig) {
        self.clouds.insert(normalize_host(host), cloud);
    }

    /// Credentials for `host`, if configured
    pub fn cloud(&self, host: &str) -> Option<&CloudConfig> {
        self.clouds.get(&normalize_host(host))
    }
}

/// Fully resolved settings used to build an engine client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub host: String,
    pub credentials: Option<CloudConfig>,
}

impl ClientSettings {
    /// Resolve the endpoint and its credentials from the config file
    pub fn resolve(paths: &HyperPaths, host: Option<&str>) -> Result<Self> {
        let host = normalize_host(host.unwrap_or(DEFAULT_HOST));
        if !host.starts_with("http://") && !host.starts_with("https://") {
            return Err(HyperError::Config(format!(
                "invalid host {}: expected an http:// or https:// URL",
                host
            )));
        }

        let config = ConfigFile::load(paths)?;
        let credentials = config.cloud(&host).cloned();
        if credentials.is_none() {
            tracing::debug!(host = %host, "no credentials configured for endpoint");
        }

        Ok(Self { host, credentials })
    }
}

/// Map `tcp://` endpoints onto https and strip trailing slashes
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    match host.strip_prefix("tcp://") {
        Some(rest) => format!("https://{}", rest),
        None => host.to_string(),
    }
}
