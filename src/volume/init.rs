//! Helper container orchestration for volume initialization
//!
//! The helper container mounts every pending volume under
//! [`INIT_VOLUME_ROOT`](crate::volume::INIT_VOLUME_ROOT) and moves through
//! created → started → fetching → syncing → removed. Fetch commands run
//! concurrently; local sources are uploaded over a floating IP that is held
//! only while uploads are in flight. The helper is removed exactly once,
//! gracefully after `sync` on success or forcibly while aborting.

use crate::engine::types::{ContainerConfig, HostConfig};
use crate::engine::{ContainerApi, NetworkApi};
use crate::volume::fetch::{FetchKind, FetchPlan};
use crate::volume::identity::TransientIdentity;
use crate::volume::rollback::Rollback;
use crate::volume::transfer::{TransferChannel, TransferSession};
use crate::volume::{InitVolume, INIT_VOLUME_IMAGE, INIT_VOLUME_ROOT};
use crate::{HyperError, Result};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Login of the helper image's upload server
const TRANSFER_USER: &str = "root";

/// Helper container configuration for one run
#[derive(Debug, Clone)]
pub struct HelperSpec {
    pub config: ContainerConfig,
    pub host_config: HostConfig,
    /// One-time upload password, only ever passed to the helper's
    /// environment and the transfer login
    pub password: String,
}

impl HelperSpec {
    /// Derive the helper from the target container's configuration
    pub fn new(target: &ContainerConfig, target_host: &HostConfig, volumes: &[InitVolume]) -> Self {
        let password = uuid::Uuid::new_v4().simple().to_string();

        let mut env = target.env.clone();
        env.push(format!("ROOTPASSWORD={}", password));
        env.push(format!("LOCALROOT={}/", INIT_VOLUME_ROOT));

        let config = ContainerConfig {
            user: target.user.clone(),
            image: INIT_VOLUME_IMAGE.to_string(),
            stop_signal: target.stop_signal.clone(),
            env,
            ..Default::default()
        };

        let host_config = HostConfig {
            binds: volumes
                .iter()
                .map(|vol| format!("{}:{}", vol.name, vol.helper_path()))
                .collect(),
            dns: target_host.dns.clone(),
            dns_options: target_host.dns_options.clone(),
            dns_search: target_host.dns_search.clone(),
            extra_hosts: target_host.extra_hosts.clone(),
        };

        Self {
            config,
            host_config,
            password,
        }
    }
}

/// Point in time by which the helper must have finished
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    after: Duration,
}

impl Deadline {
    fn starting_now(after: Duration) -> Self {
        Self {
            at: Instant::now() + after,
            after,
        }
    }

    fn expired(&self) -> HyperError {
        HyperError::Timeout(self.after)
    }

    /// Bound a step that owns no spawned work; it is dropped on expiry.
    async fn bound<T>(deadline: Option<Self>, step: impl Future<Output = Result<T>>) -> Result<T> {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline.at, step)
                .await
                .unwrap_or_else(|_| Err(deadline.expired())),
            None => step.await,
        }
    }
}

/// Populates volumes through a helper container
pub struct VolumeInitializer<E: ?Sized> {
    engine: Arc<E>,
    transfer: Arc<dyn TransferChannel>,
    deadline: Option<Duration>,
}

impl<E> VolumeInitializer<E>
where
    E: ContainerApi + NetworkApi + ?Sized + 'static,
{
    pub fn new(engine: Arc<E>, transfer: Arc<dyn TransferChannel>) -> Self {
        Self {
            engine,
            transfer,
            deadline: None,
        }
    }

    /// Fail the run if the helper has not finished within `deadline`. Fetches
    /// already running are waited for, never cancelled.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Fill `volumes` from their sources on behalf of a container configured
    /// with `target` / `target_host`.
    pub async fn initialize(
        &self,
        target: &ContainerConfig,
        target_host: &HostConfig,
        volumes: &[InitVolume],
    ) -> Result<()> {
        if volumes.is_empty() {
            return Ok(());
        }

        // classification errors surface before anything is created
        let plans = volumes
            .iter()
            .map(FetchPlan::new)
            .collect::<Result<Vec<_>>>()?;
        let helper = HelperSpec::new(target, target_host, volumes);

        let created = self
            .engine
            .create_container(&helper.config, &helper.host_config, None)
            .await?;
        let id = created.id;
        tracing::debug!(
            container = %id,
            volumes = volumes.len(),
            uploads = plans.iter().filter(|plan| plan.needs_upload()).count(),
            "helper container created"
        );

        let identity = Arc::new(TransientIdentity::new(self.engine.clone(), id.clone()));
        let mut rollback = Rollback::new();
        {
            let engine = self.engine.clone();
            let id = id.clone();
            rollback.push(format!("remove helper container {}", id), async move {
                engine.remove_container(&id, true, false).await
            });
        }
        {
            let identity = identity.clone();
            rollback.push("release floating IP", async move {
                identity.release().await.map(|_| ())
            });
        }

        let deadline = self.deadline.map(Deadline::starting_now);
        if let Err(e) = self.populate(&id, &helper, plans, identity, deadline).await {
            tracing::debug!(container = %id, error = %e, "aborting volume initialization");
            return Err(rollback.abort(e).await);
        }

        rollback.commit();
        self.engine.remove_container(&id, false, false).await?;
        tracing::info!(volumes = volumes.len(), "volumes initialized");
        Ok(())
    }

    async fn populate(
        &self,
        id: &str,
        helper: &HelperSpec,
        plans: Vec<FetchPlan>,
        identity: Arc<TransientIdentity<E>>,
        deadline: Option<Deadline>,
    ) -> Result<()> {
        Deadline::bound(deadline, self.engine.start_container(id)).await?;
        tracing::debug!(container = %id, "helper container started");

        let fetched = self
            .fetch_all(id, helper, plans, identity.clone(), deadline)
            .await;

        // uploads are done either way; the address goes back before sync
        let released = identity.release().await;
        match (fetched, released) {
            (Err(e), Err(release_err)) => {
                tracing::warn!(error = %release_err, "failed to release floating IP");
                return Err(e.with_cleanup(vec![release_err]));
            }
            (Err(e), Ok(_)) => return Err(e),
            (Ok(()), Err(release_err)) => return Err(release_err),
            (Ok(()), Ok(_)) => {}
        }

        // transfers may still be buffered in the helper
        tracing::debug!(container = %id, "syncing helper filesystem");
        let sync = ["sync".to_string()];
        Deadline::bound(
            deadline,
            run_command(&*self.engine, id, &helper.config.user, &sync),
        )
        .await
    }

    /// Run every fetch task concurrently and wait for all of them. The first
    /// failure to complete is returned; later ones are only logged. A passed
    /// deadline counts as a failure but the tasks still run to completion.
    async fn fetch_all(
        &self,
        id: &str,
        helper: &HelperSpec,
        plans: Vec<FetchPlan>,
        identity: Arc<TransientIdentity<E>>,
        mut deadline: Option<Deadline>,
    ) -> Result<()> {
        let mut tasks = JoinSet::new();
        for plan in plans {
            let engine = self.engine.clone();
            let transfer = self.transfer.clone();
            let identity = identity.clone();
            let id = id.to_string();
            let user = helper.config.user.clone();
            let password = helper.password.clone();

            tasks.spawn(async move {
                tracing::debug!(source = %plan.volume.source, target = %plan.target, "fetching volume");
                match plan.kind {
                    FetchKind::Exec(cmd) => run_command(&*engine, &id, &user, &cmd).await,
                    FetchKind::Upload => {
                        let address = identity.address().await?;
                        let session = TransferSession {
                            address,
                            user: TRANSFER_USER.to_string(),
                            password,
                        };
                        transfer
                            .upload(
                                &session,
                                Path::new(&plan.volume.source),
                                &plan.target,
                                plan.shape,
                            )
                            .await
                    }
                }
            });
        }

        let mut first_error = None;
        loop {
            let next = match deadline {
                Some(Deadline { at, .. }) => tokio::select! {
                    biased;
                    joined = tasks.join_next() => Some(joined),
                    _ = tokio::time::sleep_until(at) => None,
                },
                None => Some(tasks.join_next().await),
            };
            let joined = match next {
                Some(Some(joined)) => joined,
                Some(None) => break,
                None => {
                    if let Some(passed) = deadline.take() {
                        tracing::warn!(
                            pending = tasks.len(),
                            "volume initialization deadline passed, waiting for running fetches"
                        );
                        if first_error.is_none() {
                            first_error = Some(passed.expired());
                        }
                    }
                    continue;
                }
            };

            let result = joined.unwrap_or_else(|e| Err(HyperError::Task(e.to_string())));
            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    tracing::warn!(error = %e, "additional volume fetch failure");
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Exec `cmd` in container `id` and wait for a zero exit code
pub async fn run_command<C>(api: &C, id: &str, user: &str, cmd: &[String]) -> Result<()>
where
    C: ContainerApi + ?Sized,
{
    let exec_id = api.exec(id, user, cmd).await?;
    let code = api.wait_exec(&exec_id).await?;
    if code != 0 {
        return Err(HyperError::ExecFailed {
            command: cmd.join(" "),
            code,
        });
    }
    Ok(())
}
