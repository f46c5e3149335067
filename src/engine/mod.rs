//! Engine API collaborators
//!
//! The volume initialization code only talks to the engine through these
//! traits; [`client::EngineClient`] is the HTTP implementation.

pub mod client;
#[cfg(test)]
pub mod fake;
pub mod types;

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use types::{
    ContainerConfig, ContainerCreateResponse, ContainerJson, HostConfig, Volume,
    VolumeCreateRequest,
};

/// Container lifecycle and exec operations.
#[async_trait]
pub trait ContainerApi: Send + Sync {
    /// Create a container from the given configuration.
    async fn create_container(
        &self,
        config: &ContainerConfig,
        host_config: &HostConfig,
        name: Option<&str>,
    ) -> Result<ContainerCreateResponse>;

    /// Start a created container.
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Stop a running container, killing it after `timeout` seconds.
    async fn stop_container(&self, id: &str, timeout: u64) -> Result<()>;

    /// Remove a container, optionally with the volumes it mounts.
    async fn remove_container(&self, id: &str, force: bool, volumes: bool) -> Result<()>;

    /// Get detailed information about a container.
    async fn inspect_container(&self, id: &str) -> Result<ContainerJson>;

    /// Start `cmd` inside a running container and return the exec id.
    async fn exec(&self, id: &str, user: &str, cmd: &[String]) -> Result<String>;

    /// Wait for an exec to finish and return its exit code.
    async fn wait_exec(&self, exec_id: &str) -> Result<i64>;
}

/// Volume operations.
#[async_trait]
pub trait VolumeApi: Send + Sync {
    async fn create_volume(&self, request: &VolumeCreateRequest) -> Result<Volume>;

    async fn inspect_volume(&self, name: &str) -> Result<Volume>;

    async fn list_volumes(&self) -> Result<Vec<Volume>>;

    /// Fails while the volume is still in use by a container.
    async fn remove_volume(&self, name: &str) -> Result<()>;
}

/// Floating IP operations.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn allocate_fips(&self, count: u32) -> Result<Vec<String>>;

    async fn release_fip(&self, address: &str) -> Result<()>;

    async fn associate_fip(&self, address: &str, container: &str) -> Result<()>;

    /// Detach whatever floating IP the container holds and return it.
    async fn disassociate_fip(&self, container: &str) -> Result<String>;

    async fn list_fips(&self) -> Result<Vec<HashMap<String, String>>>;
}

/// Everything the command handlers need from the engine
pub trait Engine: ContainerApi + VolumeApi + NetworkApi {}

impl<T: ContainerApi + VolumeApi + NetworkApi> Engine for T {}
