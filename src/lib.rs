//! Hypercli - command line client for the Hyper container cloud
//!
//! Besides the usual container lifecycle verbs, this crate implements the
//! special-volume initialization protocol: binds whose source is a git
//! repository, an HTTP(S) URL or a local path are backed by a fresh volume
//! that a helper container populates before the real container is created.

pub mod cli;
pub mod engine;
pub mod storage;
pub mod volume;

use std::time::Duration;
use thiserror::Error;

/// Main error type for hypercli operations
#[derive(Error, Debug)]
pub enum HyperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error response from daemon: {message}")]
    Api { status: u16, message: String },

    #[error("No such container: {0}")]
    ContainerNotFound(String),

    #[error("No such volume: {0}")]
    VolumeNotFound(String),

    #[error("unsupported volume source type: {0}")]
    UnsupportedSource(String),

    #[error("cannot init volume from special file: {0}")]
    SpecialFile(String),

    #[error("duplicate volume destination: {0}")]
    DuplicateDestination(String),

    #[error("command `{command}` exited with code {code}")]
    ExecFailed { command: String, code: i64 },

    #[error("exec {0} stopped without reporting an exit code")]
    ExecLost(String),

    #[error("Failed to upload {source_path}: {message}")]
    Upload { source_path: String, message: String },

    #[error("floating IP error: {0}")]
    FloatingIp(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("volume initialization timed out after {0:?}")]
    Timeout(Duration),

    #[error("task failed: {0}")]
    Task(String),

    #[error("{cause} (cleanup: {})", .cleanup.join("; "))]
    Aborted {
        cause: Box<HyperError>,
        cleanup: Vec<String>,
    },
}

impl HyperError {
    /// Attach cleanup failures to an error; the original error stays the
    /// visible cause.
    pub fn with_cleanup(self, cleanup: Vec<HyperError>) -> Self {
        if cleanup.is_empty() {
            return self;
        }
        HyperError::Aborted {
            cause: Box::new(self),
            cleanup: cleanup.iter().map(ToString::to_string).collect(),
        }
    }

    /// The error that started an abort, skipping cleanup wrappers.
    pub fn root_cause(&self) -> &HyperError {
        match self {
            HyperError::Aborted { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Whether the engine reported a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root_cause(),
            HyperError::Api { status: 404, .. }
                | HyperError::ContainerNotFound(_)
                | HyperError::VolumeNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HyperError>;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "hyper";
