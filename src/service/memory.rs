// In-process discovery transport
//
// A shared registry standing in for the LAN. Every transport handed out by
// one `MemoryNetwork` sees the others' advertisements, including its own,
// just like an mDNS browser hears its own announcements.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Advertisement, CandidateEntry, DiscoveryTransport, Registration};
use crate::errors::RendezvousError;

#[derive(Default)]
struct NetworkState {
    advertised: Vec<(Registration, Advertisement)>,
    history: Vec<Advertisement>,
    injected: Vec<(String, CandidateEntry)>,
    fail_registrations: bool,
    unregisters: usize,
    lookups: usize,
    shutdowns: usize,
}

/// Shared in-memory "network".
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport attached to this network.
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport {
            network: self.clone(),
        }
    }

    /// Deliver `entry` on every lookup of `service_type`, alongside the real
    /// advertisements. Used to feed malformed or foreign records.
    pub fn inject(&self, service_type: &str, entry: CandidateEntry) {
        self.lock().injected.push((service_type.to_string(), entry));
    }

    /// Make subsequent registrations fail.
    pub fn fail_registrations(&self, fail: bool) {
        self.lock().fail_registrations = fail;
    }

    pub fn advertised(&self) -> Vec<Advertisement> {
        self.lock()
            .advertised
            .iter()
            .map(|(_, ad)| ad.clone())
            .collect()
    }

    /// Every advertisement ever registered, withdrawn or not.
    pub fn history(&self) -> Vec<Advertisement> {
        self.lock().history.clone()
    }

    pub fn unregister_count(&self) -> usize {
        self.lock().unregisters
    }

    pub fn lookup_count(&self) -> usize {
        self.lock().lookups
    }

    pub fn shutdown_count(&self) -> usize {
        self.lock().shutdowns
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        // A panicking test thread must not wedge the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One participant's view of a `MemoryNetwork`.
#[derive(Clone)]
pub struct MemoryTransport {
    network: MemoryNetwork,
}

#[async_trait]
impl DiscoveryTransport for MemoryTransport {
    fn register(&self, ad: &Advertisement) -> Result<Registration, RendezvousError> {
        let mut state = self.network.lock();
        if state.fail_registrations {
            return Err(RendezvousError::Advertise {
                instance: ad.instance.clone(),
                reason: "registration refused".to_string(),
            });
        }

        let registration = Registration {
            fullname: format!("{}.{}", ad.instance, ad.service_type),
        };
        state.advertised.push((registration.clone(), ad.clone()));
        state.history.push(ad.clone());
        Ok(registration)
    }

    fn unregister(&self, registration: &Registration) {
        let mut state = self.network.lock();
        state.advertised.retain(|(r, _)| r != registration);
        state.unregisters += 1;
    }

    async fn lookup(&self, service_type: &str) -> Result<Vec<CandidateEntry>, RendezvousError> {
        let mut state = self.network.lock();
        state.lookups += 1;

        let mut entries: Vec<CandidateEntry> = state
            .advertised
            .iter()
            .filter(|(_, ad)| ad.service_type == service_type)
            .map(|(_, ad)| CandidateEntry::from(ad))
            .collect();
        entries.extend(
            state
                .injected
                .iter()
                .filter(|(ty, _)| ty == service_type)
                .map(|(_, entry)| entry.clone()),
        );
        Ok(entries)
    }

    fn shutdown(&self) {
        self.network.lock().shutdowns += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(service_type: &str, port: u16) -> Advertisement {
        Advertisement {
            service_type: service_type.to_string(),
            instance: format!("mem-{}", port),
            port,
            address: format!("127.0.0.1:{}", port),
            name: "demo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_lookup_filters_by_service_type() {
        let network = MemoryNetwork::new();
        let transport = network.transport();
        transport.register(&ad("_a._tcp.local.", 1000)).unwrap();
        transport.register(&ad("_b._tcp.local.", 2000)).unwrap();

        let entries = transport.lookup("_a._tcp.local.").await.unwrap();
        assert_eq!(entries, vec![CandidateEntry::new("mem-1000", "127.0.0.1:1000", "demo")]);
        assert_eq!(network.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_entries_are_delivered() {
        let network = MemoryNetwork::new();
        let broken = CandidateEntry {
            instance: "broken".to_string(),
            address: None,
            name: Some("demo".to_string()),
        };
        network.inject("_a._tcp.local.", broken.clone());

        let entries = network.transport().lookup("_a._tcp.local.").await.unwrap();
        assert_eq!(entries, vec![broken]);
    }
}
