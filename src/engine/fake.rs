//! In-memory engine and transfer channel for tests

use crate::engine::types::{
    ContainerConfig, ContainerCreateResponse, ContainerJson, HostConfig, Volume,
    VolumeCreateRequest,
};
use crate::engine::{ContainerApi, NetworkApi, VolumeApi};
use crate::volume::bind::SourceShape;
use crate::volume::transfer::{TransferChannel, TransferSession};
use crate::{HyperError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateContainer {
        image: String,
        binds: Vec<String>,
        name: Option<String>,
    },
    StartContainer {
        id: String,
    },
    StopContainer {
        id: String,
    },
    RemoveContainer {
        id: String,
        force: bool,
    },
    InspectContainer {
        id: String,
    },
    Exec {
        id: String,
        cmd: Vec<String>,
    },
    WaitExec {
        exec_id: String,
    },
    CreateVolume {
        source: Option<String>,
    },
    InspectVolume {
        name: String,
    },
    ListVolumes,
    RemoveVolume {
        name: String,
    },
    AllocateFip,
    ReleaseFip {
        address: String,
    },
    AssociateFip {
        address: String,
        container: String,
    },
    DisassociateFip {
        container: String,
    },
    ListFips,
}

/// Engine double that records calls and fails on request
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashSet<String>>,
    failing_commands: Mutex<Vec<String>>,
    failing_images: Mutex<HashSet<String>>,
    volume_create_budget: Mutex<Option<usize>>,
    delays: Mutex<HashMap<String, Duration>>,
    volumes: Mutex<HashMap<String, Volume>>,
    containers: Mutex<HashMap<String, ContainerJson>>,
    execs: Mutex<HashMap<String, Vec<String>>>,
    fips: Mutex<HashMap<String, String>>,
    counter: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of the named operation fail (e.g. `"start_container"`)
    pub fn fail(&self, op: &str) {
        self.failures.lock().unwrap().insert(op.to_string());
    }

    /// Execs whose command line contains `needle` exit with code 1
    pub fn fail_command(&self, needle: &str) {
        self.failing_commands.lock().unwrap().push(needle.to_string());
    }

    /// Creating a container from `image` fails
    pub fn fail_image(&self, image: &str) {
        self.failing_images.lock().unwrap().insert(image.to_string());
    }

    /// Make the named operation take `delay` before it completes
    pub fn delay(&self, op: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(op.to_string(), delay);
    }

    /// Let `n` volume creations succeed, then fail the rest
    pub fn fail_volume_create_after(&self, n: usize) {
        *self.volume_create_budget.lock().unwrap() = Some(n);
    }

    pub fn add_volume(&self, volume: Volume) {
        self.volumes
            .lock()
            .unwrap()
            .insert(volume.name.clone(), volume);
    }

    pub fn add_container(&self, container: ContainerJson) {
        self.containers
            .lock()
            .unwrap()
            .insert(container.id.clone(), container);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Position of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.lock().unwrap().iter().position(pred)
    }

    pub fn volume_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.volumes.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn container(&self, id: &str) -> Option<ContainerJson> {
        self.containers.lock().unwrap().get(id).cloned()
    }

    pub fn container_ids(&self) -> Vec<String> {
        self.containers.lock().unwrap().keys().cloned().collect()
    }

    /// Floating IPs currently allocated, with the container they are bound to
    pub fn allocated_fips(&self) -> HashMap<String, String> {
        self.fips.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &str) -> Result<()> {
        if self.failures.lock().unwrap().contains(op) {
            return Err(HyperError::Api {
                status: 500,
                message: format!("{} failed", op),
            });
        }
        Ok(())
    }

    async fn stall(&self, op: &str) {
        let delay = self.delays.lock().unwrap().get(op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl ContainerApi for FakeEngine {
    async fn create_container(
        &self,
        config: &ContainerConfig,
        host_config: &HostConfig,
        name: Option<&str>,
    ) -> Result<ContainerCreateResponse> {
        self.record(Call::CreateContainer {
            image: config.image.clone(),
            binds: host_config.binds.clone(),
            name: name.map(String::from),
        });
        self.check("create_container")?;
        if self.failing_images.lock().unwrap().contains(&config.image) {
            return Err(HyperError::Api {
                status: 404,
                message: format!("No such image: {}", config.image),
            });
        }

        let id = self.next_id("container");
        self.add_container(ContainerJson {
            id: id.clone(),
            name: name.map(|n| format!("/{}", n)).unwrap_or_default(),
            config: config.clone(),
            host_config: host_config.clone(),
            ..Default::default()
        });
        Ok(ContainerCreateResponse {
            id,
            warnings: Vec::new(),
        })
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.record(Call::StartContainer { id: id.to_string() });
        self.check("start_container")?;
        self.stall("start_container").await;
        match self.containers.lock().unwrap().get_mut(id) {
            Some(container) => {
                container.state.running = true;
                Ok(())
            }
            None => Err(HyperError::ContainerNotFound(id.to_string())),
        }
    }

    async fn stop_container(&self, id: &str, _timeout: u64) -> Result<()> {
        self.record(Call::StopContainer { id: id.to_string() });
        self.check("stop_container")?;
        if let Some(container) = self.containers.lock().unwrap().get_mut(id) {
            container.state.running = false;
        }
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool, _volumes: bool) -> Result<()> {
        self.record(Call::RemoveContainer {
            id: id.to_string(),
            force,
        });
        self.check("remove_container")?;
        self.containers.lock().unwrap().remove(id);
        Ok(())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerJson> {
        self.record(Call::InspectContainer { id: id.to_string() });
        self.check("inspect_container")?;
        self.container(id)
            .ok_or_else(|| HyperError::ContainerNotFound(id.to_string()))
    }

    async fn exec(&self, id: &str, _user: &str, cmd: &[String]) -> Result<String> {
        self.record(Call::Exec {
            id: id.to_string(),
            cmd: cmd.to_vec(),
        });
        self.check("exec")?;
        let exec_id = self.next_id("exec");
        self.execs
            .lock()
            .unwrap()
            .insert(exec_id.clone(), cmd.to_vec());
        Ok(exec_id)
    }

    async fn wait_exec(&self, exec_id: &str) -> Result<i64> {
        self.record(Call::WaitExec {
            exec_id: exec_id.to_string(),
        });
        self.check("wait_exec")?;
        self.stall("wait_exec").await;
        let cmd = self
            .execs
            .lock()
            .unwrap()
            .get(exec_id)
            .cloned()
            .unwrap_or_default();
        let line = cmd.join(" ");
        let fails = self
            .failing_commands
            .lock()
            .unwrap()
            .iter()
            .any(|needle| line.contains(needle.as_str()));
        Ok(if fails { 1 } else { 0 })
    }
}

#[async_trait]
impl VolumeApi for FakeEngine {
    async fn create_volume(&self, request: &VolumeCreateRequest) -> Result<Volume> {
        self.record(Call::CreateVolume {
            source: request.labels.get("source").cloned(),
        });
        self.check("create_volume")?;
        {
            let mut budget = self.volume_create_budget.lock().unwrap();
            if let Some(left) = budget.as_mut() {
                if *left == 0 {
                    return Err(HyperError::Api {
                        status: 500,
                        message: "volume quota exceeded".to_string(),
                    });
                }
                *left -= 1;
            }
        }

        let name = if request.name.is_empty() {
            self.next_id("vol")
        } else {
            request.name.clone()
        };
        let volume = Volume {
            name,
            driver: request.driver.clone(),
            mountpoint: String::new(),
            labels: request.labels.clone(),
        };
        self.add_volume(volume.clone());
        Ok(volume)
    }

    async fn inspect_volume(&self, name: &str) -> Result<Volume> {
        self.record(Call::InspectVolume {
            name: name.to_string(),
        });
        self.check("inspect_volume")?;
        self.volumes
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| HyperError::VolumeNotFound(name.to_string()))
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        self.record(Call::ListVolumes);
        self.check("list_volumes")?;
        let mut volumes: Vec<Volume> = self.volumes.lock().unwrap().values().cloned().collect();
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volumes)
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        self.record(Call::RemoveVolume {
            name: name.to_string(),
        });
        self.check("remove_volume")?;
        self.volumes
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| HyperError::VolumeNotFound(name.to_string()))
    }
}

#[async_trait]
impl NetworkApi for FakeEngine {
    async fn allocate_fips(&self, count: u32) -> Result<Vec<String>> {
        self.record(Call::AllocateFip);
        self.check("allocate_fips")?;
        let mut fips = self.fips.lock().unwrap();
        let mut allocated = Vec::new();
        for _ in 0..count {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let address = format!("203.0.113.{}", n % 250 + 1);
            fips.insert(address.clone(), String::new());
            allocated.push(address);
        }
        Ok(allocated)
    }

    async fn release_fip(&self, address: &str) -> Result<()> {
        self.record(Call::ReleaseFip {
            address: address.to_string(),
        });
        self.check("release_fip")?;
        self.fips.lock().unwrap().remove(address);
        Ok(())
    }

    async fn associate_fip(&self, address: &str, container: &str) -> Result<()> {
        self.record(Call::AssociateFip {
            address: address.to_string(),
            container: container.to_string(),
        });
        self.check("associate_fip")?;
        self.stall("associate_fip").await;
        self.fips
            .lock()
            .unwrap()
            .insert(address.to_string(), container.to_string());
        Ok(())
    }

    async fn disassociate_fip(&self, container: &str) -> Result<String> {
        self.record(Call::DisassociateFip {
            container: container.to_string(),
        });
        self.check("disassociate_fip")?;
        let mut fips = self.fips.lock().unwrap();
        let address = fips
            .iter()
            .find(|(_, owner)| owner.as_str() == container)
            .map(|(address, _)| address.clone())
            .ok_or_else(|| HyperError::FloatingIp(format!("{} has no floating IP", container)))?;
        fips.insert(address.clone(), String::new());
        Ok(address)
    }

    async fn list_fips(&self) -> Result<Vec<HashMap<String, String>>> {
        self.record(Call::ListFips);
        self.check("list_fips")?;
        Ok(self
            .fips
            .lock()
            .unwrap()
            .iter()
            .map(|(fip, container)| {
                HashMap::from([
                    ("fip".to_string(), fip.clone()),
                    ("container".to_string(), container.clone()),
                ])
            })
            .collect())
    }
}

/// One upload seen by [`FakeTransfer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub session: TransferSession,
    pub source: PathBuf,
    pub target: String,
    pub shape: SourceShape,
}

/// Transfer channel that copies uploads under a local directory standing in
/// for the helper container's filesystem
#[derive(Default)]
pub struct FakeTransfer {
    root: Option<PathBuf>,
    fail: bool,
    uploads: Mutex<Vec<Upload>>,
}

impl FakeTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy uploaded files under `root`
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferChannel for FakeTransfer {
    async fn upload(
        &self,
        session: &TransferSession,
        source: &Path,
        target: &str,
        shape: SourceShape,
    ) -> Result<()> {
        self.uploads.lock().unwrap().push(Upload {
            session: session.clone(),
            source: source.to_path_buf(),
            target: target.to_string(),
            shape,
        });
        if self.fail {
            return Err(HyperError::Upload {
                source_path: source.display().to_string(),
                message: "connection refused".to_string(),
            });
        }

        if let (Some(root), SourceShape::File) = (&self.root, shape) {
            let dest = root.join(target.trim_start_matches('/'));
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(source, dest)?;
        }
        Ok(())
    }
}
