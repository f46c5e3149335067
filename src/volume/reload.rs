//! Re-populating initialized volumes of an existing container

use crate::engine::types::{ContainerConfig, HostConfig};
use crate::engine::{ContainerApi, NetworkApi, VolumeApi};
use crate::volume::init::VolumeInitializer;
use crate::volume::{InitVolume, SOURCE_LABEL};
use crate::Result;

/// Stop signal of the reload helper
const RELOAD_STOP_SIGNAL: &str = "SIGTERM";

/// Recover the initialized volumes of `container_id` from its binds and the
/// `source` label of the volumes they name.
pub async fn init_volumes_of<A>(api: &A, container_id: &str) -> Result<Vec<InitVolume>>
where
    A: ContainerApi + VolumeApi + ?Sized,
{
    let container = api.inspect_container(container_id).await?;
    let mut volumes = Vec::new();

    for bind in &container.host_config.binds {
        let parts: Vec<&str> = bind.split(':').collect();
        let [name, destination] = parts.as_slice() else {
            continue;
        };
        // host paths are never volumes
        if name.starts_with('/') {
            continue;
        }
        let volume = api.inspect_volume(name).await?;
        if let Some(source) = volume.labels.get(SOURCE_LABEL) {
            volumes.push(InitVolume {
                source: source.clone(),
                destination: destination.to_string(),
                name: volume.name,
            });
        }
    }

    tracing::debug!(container = %container_id, volumes = volumes.len(), "found initialized volumes");
    Ok(volumes)
}

/// Fill the container's initialized volumes again from their sources. The
/// existing volumes are reused; nothing new is provisioned.
pub async fn reload_volumes<E>(
    initializer: &VolumeInitializer<E>,
    api: &E,
    container_id: &str,
) -> Result<usize>
where
    E: ContainerApi + VolumeApi + NetworkApi + ?Sized + 'static,
{
    let volumes = init_volumes_of(api, container_id).await?;
    if volumes.is_empty() {
        return Ok(0);
    }

    let target = ContainerConfig {
        stop_signal: RELOAD_STOP_SIGNAL.to_string(),
        ..Default::default()
    };
    initializer
        .initialize(&target, &HostConfig::default(), &volumes)
        .await?;
    Ok(volumes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{Call, FakeEngine, FakeTransfer};
    use crate::engine::types::{ContainerJson, Volume};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn labelled(name: &str, source: Option<&str>) -> Volume {
        Volume {
            name: name.to_string(),
            driver: "hyper".to_string(),
            mountpoint: String::new(),
            labels: source
                .map(|s| HashMap::from([(SOURCE_LABEL.to_string(), s.to_string())]))
                .unwrap_or_default(),
        }
    }

    fn container(binds: &[&str]) -> ContainerJson {
        ContainerJson {
            id: "web".to_string(),
            config: ContainerConfig {
                user: "app".to_string(),
                stop_signal: "SIGINT".to_string(),
                ..Default::default()
            },
            host_config: HostConfig {
                binds: binds.iter().map(|b| b.to_string()).collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_recovers_labelled_volumes_only() {
        let engine = FakeEngine::new();
        engine.add_volume(labelled("v1", Some("git://host/a.git")));
        engine.add_volume(labelled("plain", None));
        engine.add_container(container(&["v1:/src", "plain:/data", "/host:/host:ro", "/etc"]));

        let volumes = init_volumes_of(&engine, "web").await.unwrap();

        assert_eq!(
            volumes,
            vec![InitVolume {
                source: "git://host/a.git".to_string(),
                destination: "/src".to_string(),
                name: "v1".to_string(),
            }]
        );
        assert_eq!(engine.count(|c| matches!(c, Call::InspectVolume { .. })), 2);
    }

    #[tokio::test]
    async fn test_reload_reuses_existing_volumes() {
        let engine = Arc::new(FakeEngine::new());
        engine.add_volume(labelled("v1", Some("git://host/a.git")));
        engine.add_container(container(&["v1:/src"]));
        let initializer = VolumeInitializer::new(engine.clone(), Arc::new(FakeTransfer::new()));

        let reloaded = reload_volumes(&initializer, &*engine, "web").await.unwrap();

        assert_eq!(reloaded, 1);
        assert_eq!(engine.count(|c| matches!(c, Call::CreateVolume { .. })), 0);
        let helper = engine
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::CreateContainer { binds, .. } => Some(binds),
                _ => None,
            })
            .unwrap();
        assert_eq!(helper, vec!["v1:/vol/src"]);
        assert_eq!(engine.volume_names(), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_reload_without_init_volumes_is_noop() {
        let engine = Arc::new(FakeEngine::new());
        engine.add_container(container(&["/host:/host"]));
        let initializer = VolumeInitializer::new(engine.clone(), Arc::new(FakeTransfer::new()));

        let reloaded = reload_volumes(&initializer, &*engine, "web").await.unwrap();
        assert_eq!(reloaded, 0);
        assert_eq!(engine.count(|c| matches!(c, Call::CreateContainer { .. })), 0);
    }

    #[tokio::test]
    async fn test_missing_container() {
        let engine = FakeEngine::new();
        let err = init_volumes_of(&engine, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
