//! Floating IP lifecycle for the helper container
//!
//! Local sources are uploaded over the network, so the helper container needs
//! a public address while those uploads run. One address is acquired per
//! initialization run, on first use, and shared by every upload.

use crate::engine::NetworkApi;
use crate::{HyperError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Allocate one floating IP, not yet attached to anything
pub async fn allocate<N>(network: &N) -> Result<String>
where
    N: NetworkApi + ?Sized,
{
    network
        .allocate_fips(1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| HyperError::FloatingIp("engine allocated no address".to_string()))
}

/// Detach the container's floating IP and release it
pub async fn release<N>(network: &N, container_id: &str) -> Result<String>
where
    N: NetworkApi + ?Sized,
{
    let address = network.disassociate_fip(container_id).await?;
    network.release_fip(&address).await?;
    tracing::debug!(%address, container = %container_id, "floating IP released");
    Ok(address)
}

enum Slot {
    Empty,
    /// Allocated but not yet attached to the container
    Allocated(String),
    Acquired(String),
    Failed(String),
    Released,
}

/// Lazily acquired floating IP shared by concurrent uploads
pub struct TransientIdentity<N: ?Sized> {
    network: Arc<N>,
    container_id: String,
    slot: Mutex<Slot>,
}

impl<N> TransientIdentity<N>
where
    N: NetworkApi + ?Sized,
{
    pub fn new(network: Arc<N>, container_id: impl Into<String>) -> Self {
        Self {
            network,
            container_id: container_id.into(),
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// The address, acquiring it on first call. A failed acquisition is not
    /// retried; later callers get the same error.
    pub async fn address(&self) -> Result<String> {
        let mut slot = self.slot.lock().await;
        match &*slot {
            Slot::Acquired(address) => return Ok(address.clone()),
            Slot::Failed(message) => return Err(HyperError::FloatingIp(message.clone())),
            Slot::Allocated(_) | Slot::Released => {
                return Err(HyperError::FloatingIp(
                    "floating IP is no longer available".to_string(),
                ))
            }
            Slot::Empty => {}
        }

        let address = match allocate(&*self.network).await {
            Ok(address) => address,
            Err(e) => {
                *slot = Slot::Failed(e.to_string());
                return Err(e);
            }
        };
        // recorded before attaching so release() can still free it
        *slot = Slot::Allocated(address.clone());

        if let Err(e) = self
            .network
            .associate_fip(&address, &self.container_id)
            .await
        {
            if let Err(release_err) = self.network.release_fip(&address).await {
                tracing::warn!(%address, error = %release_err, "failed to release unattached floating IP");
            }
            *slot = Slot::Failed(e.to_string());
            return Err(e);
        }

        tracing::debug!(%address, container = %self.container_id, "floating IP attached");
        *slot = Slot::Acquired(address.clone());
        Ok(address)
    }

    #[cfg(test)]
    pub async fn is_acquired(&self) -> bool {
        matches!(&*self.slot.lock().await, Slot::Acquired(_))
    }

    /// Release the address if one is held. `Ok(None)` when nothing was acquired.
    pub async fn release(&self) -> Result<Option<String>> {
        let mut slot = self.slot.lock().await;
        // released or not, the address must not be handed out again
        match std::mem::replace(&mut *slot, Slot::Released) {
            Slot::Acquired(_) => release(&*self.network, &self.container_id)
                .await
                .map(Some),
            Slot::Allocated(address) => {
                self.network.release_fip(&address).await?;
                tracing::debug!(%address, "unattached floating IP released");
                Ok(Some(address))
            }
            other => {
                *slot = other;
                Ok(None)
            }
        }
    }
}
