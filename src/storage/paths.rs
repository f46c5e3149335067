//! Path management for the ~/.hyper/ directory structure

use crate::{HyperError, Result};
use std::path::{Path, PathBuf};

/// Name of the client config file inside the root directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Manages paths for the client's local state
#[derive(Debug, Clone)]
pub struct HyperPaths {
    root: PathBuf,
}

impl HyperPaths {
    /// Create a new HyperPaths instance using the default root (~/.hyper/)
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            HyperError::Config(
                "Could not determine user home directory. Please ensure HOME environment variable is set."
                    .to_string(),
            )
        })?;

        Ok(Self {
            root: home.join(".hyper"),
        })
    }

    /// Use `root` when given, the default root otherwise
    pub fn resolve(root: Option<&Path>) -> Result<Self> {
        match root {
            Some(root) => Ok(Self::with_root(root)),
            None => Self::new(),
        }
    }

    /// Create a new HyperPaths instance with a custom root
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the root directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Client config file (cloud endpoints and credentials)
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }
}
