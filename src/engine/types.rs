//! JSON shapes exchanged with the engine API

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Treat an explicit `null` like a missing field
fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Portable container configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(default, deserialize_with = "null_default")]
    pub env: Vec<String>,
    #[serde(default, deserialize_with = "null_default", skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "null_default", skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_dir: String,
    #[serde(default)]
    pub tty: bool,
    #[serde(default)]
    pub open_stdin: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stop_signal: String,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: HashMap<String, String>,
}

/// Non-portable, host-side container configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    #[serde(default, deserialize_with = "null_default")]
    pub binds: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub dns: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub dns_options: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub dns_search: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub extra_hosts: Vec<String>,
}

/// Body of `POST /containers/create`
#[derive(Debug, Serialize)]
pub(crate) struct ContainerCreateBody<'a> {
    #[serde(flatten)]
    pub config: &'a ContainerConfig,
    #[serde(rename = "HostConfig")]
    pub host_config: &'a HostConfig,
}

/// Response of `POST /containers/create`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCreateResponse {
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub warnings: Vec<String>,
}

/// Runtime state of a container
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub running: bool,
}

/// Response of `GET /containers/{id}/json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerJson {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: ContainerState,
    #[serde(default)]
    pub config: ContainerConfig,
    #[serde(default)]
    pub host_config: HostConfig,
}

/// Body of `POST /containers/{id}/exec`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ExecCreateBody<'a> {
    pub user: &'a str,
    pub cmd: &'a [String],
    pub attach_stdout: bool,
    pub attach_stderr: bool,
}

/// Response of `POST /containers/{id}/exec`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ExecCreateResponse {
    pub id: String,
}

/// Response of `GET /exec/{id}/json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecInspect {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub exit_code: Option<i64>,
}

/// Body of `POST /volumes/create`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeCreateRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub driver: String,
    pub driver_opts: HashMap<String, String>,
    pub labels: HashMap<String, String>,
}

/// A volume as reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub mountpoint: String,
    #[serde(default, deserialize_with = "null_default")]
    pub labels: HashMap<String, String>,
}

/// Response of `GET /volumes`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct VolumeListResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub volumes: Vec<Volume>,
}

/// Engine error body
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
