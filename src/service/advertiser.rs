// Advertiser
//
// Publishes this instance's (address, name) record and withdraws it exactly
// once, either explicitly when the rendezvous is decided or on drop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Advertisement, DiscoveryTransport, Registration};
use crate::errors::RendezvousError;

/// A live advertisement.
pub struct Advertiser<T: DiscoveryTransport> {
    transport: Arc<T>,
    registration: Registration,
    instance: String,
    stopped: AtomicBool,
}

impl<T: DiscoveryTransport> Advertiser<T> {
    /// Register `ad` with the transport. A failure here is fatal to the
    /// rendezvous: nobody can find an instance that is not advertised.
    pub fn start(transport: Arc<T>, ad: &Advertisement) -> Result<Self, RendezvousError> {
        let registration = transport.register(ad)?;

        tracing::info!(
            instance = %ad.instance,
            address = %ad.address,
            name = %ad.name,
            "Advertising rendezvous"
        );

        Ok(Self {
            transport,
            registration,
            instance: ad.instance.clone(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Withdraw the advertisement. Returns true only for the call that
    /// actually released it; later calls are no-ops.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.transport.unregister(&self.registration);
        tracing::info!(instance = %self.instance, "Stopped advertising");
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }
}

impl<T: DiscoveryTransport> Drop for Advertiser<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
