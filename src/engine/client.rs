//! HTTP client for the remote engine API

use crate::engine::types::{
    ContainerConfig, ContainerCreateBody, ContainerCreateResponse, ContainerJson, ErrorBody,
    ExecCreateBody, ExecCreateResponse, ExecInspect, HostConfig, Volume, VolumeCreateRequest,
    VolumeListResponse,
};
use crate::engine::{ContainerApi, NetworkApi, VolumeApi};
use crate::storage::config::{ClientSettings, CloudConfig};
use crate::{HyperError, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

/// How often a running exec is polled for completion
const EXEC_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polls tolerated for a stopped exec that has not reported its exit code
const EXEC_EXIT_CODE_POLLS: u32 = 20;

/// Outcome of one exec inspection: `Some` once the wait is over
fn exec_exit(exec_id: &str, inspect: &ExecInspect, missing: &mut u32) -> Option<Result<i64>> {
    if inspect.running {
        return None;
    }
    if let Some(code) = inspect.exit_code {
        return Some(Ok(code));
    }
    *missing += 1;
    if *missing >= EXEC_EXIT_CODE_POLLS {
        return Some(Err(HyperError::ExecLost(exec_id.to_string())));
    }
    None
}

/// Engine client for containers, volumes and floating IPs
pub struct EngineClient {
    client: reqwest::Client,
    host: String,
    credentials: Option<CloudConfig>,
}

impl EngineClient {
    /// Create a new engine client
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            host: settings.host.clone(),
            credentials: settings.credentials.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.host, path);
        tracing::debug!(%method, %url, "engine request");

        let builder = self.client.request(method, url);
        match &self.credentials {
            Some(cloud) => builder.basic_auth(&cloud.access_key, Some(&cloud.secret_key)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => err.message,
            Err(_) if !body.trim().is_empty() => body.trim().to_string(),
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };

        Err(HyperError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContainerApi for EngineClient {
    async fn create_container(
        &self,
        config: &ContainerConfig,
        host_config: &HostConfig,
        name: Option<&str>,
    ) -> Result<ContainerCreateResponse> {
        let mut builder = self.request(Method::POST, "/containers/create");
        if let Some(name) = name {
            builder = builder.query(&[("name", name)]);
        }
        let body = ContainerCreateBody {
            config,
            host_config,
        };
        self.send_json(builder.json(&body)).await
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let path = format!("/containers/{}/start", id);
        self.send(self.request(Method::POST, &path)).await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str, timeout: u64) -> Result<()> {
        let path = format!("/containers/{}/stop", id);
        let builder = self
            .request(Method::POST, &path)
            .query(&[("t", timeout.to_string())]);
        self.send(builder).await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool, volumes: bool) -> Result<()> {
        let path = format!("/containers/{}", id);
        let builder = self.request(Method::DELETE, &path).query(&[
            ("force", force.to_string()),
            ("v", volumes.to_string()),
        ]);
        self.send(builder).await?;
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerJson> {
        let path = format!("/containers/{}/json", id);
        match self.send_json(self.request(Method::GET, &path)).await {
            Err(HyperError::Api { status: 404, .. }) => {
                Err(HyperError::ContainerNotFound(id.to_string()))
            }
            other => other,
        }
    }

    async fn exec(&self, id: &str, user: &str, cmd: &[String]) -> Result<String> {
        let path = format!("/containers/{}/exec", id);
        let body = ExecCreateBody {
            user,
            cmd,
            attach_stdout: false,
            attach_stderr: false,
        };
        let created: ExecCreateResponse = self
            .send_json(self.request(Method::POST, &path).json(&body))
            .await?;

        let start_path = format!("/exec/{}/start", created.id);
        let start_body = serde_json::json!({ "Detach": true, "Tty": false });
        self.send(self.request(Method::POST, &start_path).json(&start_body))
            .await?;

        tracing::debug!(container = %id, exec = %created.id, ?cmd, "exec started");
        Ok(created.id)
    }

    async fn wait_exec(&self, exec_id: &str) -> Result<i64> {
        let path = format!("/exec/{}/json", exec_id);
        let mut missing = 0;
        loop {
            let inspect: ExecInspect = self.send_json(self.request(Method::GET, &path)).await?;
            if let Some(exit) = exec_exit(exec_id, &inspect, &mut missing) {
                return exit;
            }
            tokio::time::sleep(EXEC_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl VolumeApi for EngineClient {
    async fn create_volume(&self, request: &VolumeCreateRequest) -> Result<Volume> {
        self.send_json(self.request(Method::POST, "/volumes/create").json(request))
            .await
    }

    async fn inspect_volume(&self, name: &str) -> Result<Volume> {
        let path = format!("/volumes/{}", name);
        match self.send_json(self.request(Method::GET, &path)).await {
            Err(HyperError::Api { status: 404, .. }) => {
                Err(HyperError::VolumeNotFound(name.to_string()))
            }
            other => other,
        }
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let list: VolumeListResponse = self.send_json(self.request(Method::GET, "/volumes")).await?;
        Ok(list.volumes)
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        let path = format!("/volumes/{}", name);
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}

#[async_trait]
impl NetworkApi for EngineClient {
    async fn allocate_fips(&self, count: u32) -> Result<Vec<String>> {
        let builder = self
            .request(Method::POST, "/fips/allocate")
            .query(&[("count", count.to_string())]);
        self.send_json(builder).await
    }

    async fn release_fip(&self, address: &str) -> Result<()> {
        let builder = self
            .request(Method::POST, "/fips/release")
            .query(&[("ip", address)]);
        self.send(builder).await?;
        Ok(())
    }

    async fn associate_fip(&self, address: &str, container: &str) -> Result<()> {
        let builder = self
            .request(Method::POST, "/fips/associate")
            .query(&[("ip", address), ("container", container)]);
        self.send(builder).await?;
        Ok(())
    }

    async fn disassociate_fip(&self, container: &str) -> Result<String> {
        let builder = self
            .request(Method::POST, "/fips/deassociate")
            .query(&[("container", container)]);
        self.send_json(builder).await
    }

    async fn list_fips(&self) -> Result<Vec<HashMap<String, String>>> {
        self.send_json(self.request(Method::GET, "/fips")).await
    }
}
