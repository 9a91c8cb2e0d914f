// Service advertisement and discovery
//
// The rendezvous core only needs two things from the network: publish an
// (address, name) record, and look up records of the same service type.
// `DiscoveryTransport` is that seam; `MdnsTransport` is the real network,
// `MemoryNetwork` an in-process stand-in.

pub mod advertiser;
pub mod discovery;
pub mod mdns;
pub mod memory;

use async_trait::async_trait;

use crate::errors::RendezvousError;

pub use advertiser::Advertiser;
pub use discovery::{candidate_queue, CandidateReceiver, CandidateSender, Discoverer};
pub use mdns::MdnsTransport;
pub use memory::{MemoryNetwork, MemoryTransport};

/// Local hostname without a `.local` suffix, for instance labels.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim_end_matches(".local").to_string())
        .unwrap_or_else(|| "lanpipe".to_string())
}

/// A record published so peers using the same name can find us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub service_type: String,
    /// Instance label, unique per process on the network
    pub instance: String,
    /// Listener port, also embedded in `address`
    pub port: u16,
    /// Listener `ip:port` as the peer should dial it
    pub address: String,
    /// Rendezvous name
    pub name: String,
}

/// One discovered advertisement, pending evaluation.
///
/// Fields are optional because the transport delivers whatever it finds;
/// entries missing either field are filtered by the election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    pub instance: String,
    pub address: Option<String>,
    pub name: Option<String>,
}

impl CandidateEntry {
    pub fn new(instance: impl Into<String>, address: &str, name: &str) -> Self {
        Self {
            instance: instance.into(),
            address: Some(address.to_string()),
            name: Some(name.to_string()),
        }
    }
}

impl From<&Advertisement> for CandidateEntry {
    fn from(ad: &Advertisement) -> Self {
        Self::new(ad.instance.clone(), &ad.address, &ad.name)
    }
}

/// Handle returned by a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub fullname: String,
}

/// Discovery transport used by the advertiser and the poller.
#[async_trait]
pub trait DiscoveryTransport: Send + Sync + 'static {
    /// Publish an advertisement.
    fn register(&self, ad: &Advertisement) -> Result<Registration, RendezvousError>;

    /// Withdraw an advertisement. Failures are logged, never returned.
    fn unregister(&self, registration: &Registration);

    /// Run one browse round and return every entry seen.
    async fn lookup(&self, service_type: &str) -> Result<Vec<CandidateEntry>, RendezvousError>;

    /// Release transport-wide resources once the rendezvous is decided.
    fn shutdown(&self) {}
}
