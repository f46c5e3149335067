//! Ephemeral volume creation for special binds

use crate::engine::types::VolumeCreateRequest;
use crate::engine::VolumeApi;
use crate::volume::bind::BindSpec;
use crate::volume::rollback::Rollback;
use crate::volume::{InitVolume, SOURCE_LABEL, VOLUME_DRIVER};
use crate::{HyperError, Result};
use std::collections::{HashMap, HashSet};

/// Volumes created for one bind list, plus the actions that remove them
pub struct Provisioned<'a> {
    pub volumes: Vec<InitVolume>,
    pub rollback: Rollback<'a>,
}

impl Provisioned<'_> {
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Create a volume for every special bind and rewrite those binds in place
/// to `<volume>:<destination>`.
///
/// Every special bind is classified before any volume is created. If a
/// creation fails, the volumes created so far are removed (failures only
/// logged), `binds` is restored and the creation error is returned.
pub async fn provision<'a, V>(api: &'a V, binds: &mut [String]) -> Result<Provisioned<'a>>
where
    V: VolumeApi + ?Sized,
{
    let mut pending = Vec::new();
    let mut destinations = HashSet::new();
    for (idx, raw) in binds.iter().enumerate() {
        let bind = BindSpec::parse(raw);
        if !bind.is_special() {
            continue;
        }
        bind.shape()?;
        let destination = bind.destination.trim_end_matches('/').to_string();
        if !destinations.insert(destination) {
            return Err(HyperError::DuplicateDestination(bind.destination));
        }
        pending.push((idx, bind));
    }

    let original = binds.to_vec();
    let mut rollback = Rollback::new();
    let mut volumes = Vec::with_capacity(pending.len());

    for (idx, bind) in pending {
        let request = VolumeCreateRequest {
            driver: VOLUME_DRIVER.to_string(),
            labels: HashMap::from([(SOURCE_LABEL.to_string(), bind.source.clone())]),
            ..Default::default()
        };

        let volume = match api.create_volume(&request).await {
            Ok(volume) => volume,
            Err(e) => {
                tracing::debug!(source = %bind.source, error = %e, "volume create failed");
                let failures = rollback.unwind().await;
                if !failures.is_empty() {
                    tracing::warn!(
                        count = failures.len(),
                        "some volumes could not be removed"
                    );
                }
                binds.clone_from_slice(&original);
                return Err(e);
            }
        };

        let name = volume.name.clone();
        rollback.push(format!("remove volume {}", name), async move {
            api.remove_volume(&name).await
        });

        let init = InitVolume {
            source: bind.source,
            destination: bind.destination,
            name: volume.name,
        };
        tracing::debug!(volume = %init.name, source = %init.source, "volume created");
        binds[idx] = init.bind();
        volumes.push(init);
    }

    Ok(Provisioned { volumes, rollback })
}
