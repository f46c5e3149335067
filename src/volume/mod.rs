//! Special volume initialization
//!
//! A bind like `git://host/repo.git:/src`, `https://host/file:/data` or
//! `/local/dir:/data` is backed by a new volume that a short-lived helper
//! container fills from the source before the real container is created.

pub mod bind;
pub mod fetch;
pub mod identity;
pub mod init;
pub mod provision;
pub mod reload;
pub mod rollback;
pub mod transfer;

/// Image that runs the fetch commands and the upload server
pub const INIT_VOLUME_IMAGE: &str = "hyperhq/volume_uploader:v1";

/// Mount root inside the helper container
pub const INIT_VOLUME_ROOT: &str = "/vol";

/// File name a file-shaped source is stored as inside its volume
pub const INIT_VOLUME_FILENAME: &str = ".hyper_file_volume_data_do_not_create_on_your_own";

/// Volume label holding the original bind source
pub const SOURCE_LABEL: &str = "source";

/// Driver used for initialized volumes
pub const VOLUME_DRIVER: &str = "hyper";

/// A volume that is (re)populated from a bind source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitVolume {
    pub source: String,
    pub destination: String,
    pub name: String,
}

impl InitVolume {
    /// Where this volume is mounted inside the helper container
    pub fn helper_path(&self) -> String {
        helper_path(&self.destination)
    }

    /// Bind entry the real container uses for this volume
    pub fn bind(&self) -> String {
        format!("{}:{}", self.name, self.destination)
    }
}

/// Mount path under [`INIT_VOLUME_ROOT`] for a container destination
pub fn helper_path(destination: &str) -> String {
    format!(
        "{}/{}",
        INIT_VOLUME_ROOT,
        destination.trim_start_matches('/')
    )
}
