// mDNS/Bonjour discovery transport
//
// Advertises the listener on the local network and browses for peers

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use super::{local_hostname, Advertisement, CandidateEntry, DiscoveryTransport, Registration};
use crate::config::constants::{TXT_ADDR, TXT_NAME, TXT_VERSION};
use crate::errors::RendezvousError;

/// Discovery over mDNS (Bonjour)
pub struct MdnsTransport {
    daemon: ServiceDaemon,
    hostname: String,
    lookup_window: Duration,
}

impl MdnsTransport {
    /// Create the mDNS daemon. Each lookup round listens for `lookup_window`.
    pub fn new(lookup_window: Duration) -> Result<Self, RendezvousError> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| RendezvousError::Transport(format!("mDNS daemon: {}", e)))?;

        Ok(Self {
            daemon,
            hostname: local_hostname(),
            lookup_window,
        })
    }
}

#[async_trait]
impl DiscoveryTransport for MdnsTransport {
    fn register(&self, ad: &Advertisement) -> Result<Registration, RendezvousError> {
        let advertise_err = |reason: String| RendezvousError::Advertise {
            instance: ad.instance.clone(),
            reason,
        };

        // Build TXT record properties
        let mut properties = HashMap::new();
        properties.insert(TXT_ADDR.to_string(), ad.address.clone());
        properties.insert(TXT_NAME.to_string(), ad.name.clone());
        properties.insert(TXT_VERSION.to_string(), env!("CARGO_PKG_VERSION").to_string());

        let service_info = ServiceInfo::new(
            &ad.service_type,
            &ad.instance,
            &format!("{}.local.", self.hostname),
            "",
            ad.port,
            properties,
        )
        .map_err(|e| advertise_err(e.to_string()))?
        .enable_addr_auto();

        let fullname = service_info.get_fullname().to_string();

        self.daemon
            .register(service_info)
            .map_err(|e| advertise_err(e.to_string()))?;

        tracing::debug!(fullname = %fullname, port = ad.port, "Registered mDNS service");

        Ok(Registration { fullname })
    }

    fn unregister(&self, registration: &Registration) {
        if let Err(e) = self.daemon.unregister(&registration.fullname) {
            tracing::warn!("mDNS: failed to unregister {}: {}", registration.fullname, e);
        }
    }

    async fn lookup(&self, service_type: &str) -> Result<Vec<CandidateEntry>, RendezvousError> {
        let receiver = self
            .daemon
            .browse(service_type)
            .map_err(|e| RendezvousError::Browse {
                service_type: service_type.to_string(),
                reason: e.to_string(),
            })?;

        let daemon = self.daemon.clone();
        let browsed = service_type.to_string();
        let window = self.lookup_window;

        // The browse channel is blocking; drain it off the async workers.
        let entries = tokio::task::spawn_blocking(move || {
            let deadline = Instant::now() + window;
            let mut entries = Vec::new();

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match receiver.recv_timeout(remaining) {
                    Ok(ServiceEvent::ServiceResolved(info)) => entries.push(entry_from_info(&info)),
                    Ok(ServiceEvent::SearchStopped(_)) => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }

            // Ends the round; a daemon already shut down just errors here.
            let _ = daemon.stop_browse(&browsed);
            entries
        })
        .await
        .map_err(|e| RendezvousError::Browse {
            service_type: service_type.to_string(),
            reason: e.to_string(),
        })?;

        Ok(entries)
    }

    fn shutdown(&self) {
        // Shutdown unregisters all services and stops browsing
        if let Err(e) = self.daemon.shutdown() {
            tracing::debug!("mDNS: shutdown failed: {}", e);
        }
    }
}

/// Convert a resolved record into a candidate.
///
/// A listener bound to an unspecified address advertises `0.0.0.0:port`,
/// which is not dialable from another host; substitute the first resolved
/// IPv4 address and keep the advertised port.
fn entry_from_info(info: &ServiceInfo) -> CandidateEntry {
    let properties = info.get_properties();
    let name = properties.get(TXT_NAME).map(|p| p.val_str().to_string());
    let address = properties
        .get(TXT_ADDR)
        .map(|p| p.val_str().to_string())
        .map(|raw| {
            let resolved: Vec<IpAddr> = info.get_addresses().iter().copied().collect();
            rewrite_unspecified(&raw, &resolved)
        });

    CandidateEntry {
        instance: info.get_fullname().to_string(),
        address,
        name,
    }
}

fn rewrite_unspecified(raw: &str, resolved: &[IpAddr]) -> String {
    let Ok(advertised) = raw.parse::<SocketAddr>() else {
        return raw.to_string();
    };
    if !advertised.ip().is_unspecified() {
        return raw.to_string();
    }
    match resolved.iter().find(|ip| ip.is_ipv4()).or(resolved.first()) {
        Some(ip) => SocketAddr::new(*ip, advertised.port()).to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::SERVICE_TYPE;

    #[test]
    fn service_type_is_valid() {
        assert!(SERVICE_TYPE.ends_with("._tcp.local."));
        assert!(SERVICE_TYPE.starts_with('_'));
    }

    #[test]
    fn test_specified_address_kept() {
        let resolved: Vec<IpAddr> = vec!["192.168.1.20".parse().unwrap()];
        assert_eq!(rewrite_unspecified("127.0.0.1:51000", &resolved), "127.0.0.1:51000");
    }

    #[test]
    fn test_unspecified_address_rewritten() {
        let resolved: Vec<IpAddr> = vec!["fe80::1".parse().unwrap(), "192.168.1.20".parse().unwrap()];
        assert_eq!(rewrite_unspecified("0.0.0.0:51000", &resolved), "192.168.1.20:51000");
    }

    #[test]
    fn test_unspecified_without_resolution_kept() {
        assert_eq!(rewrite_unspecified("0.0.0.0:51000", &[]), "0.0.0.0:51000");
    }

    #[test]
    fn test_garbage_address_passed_through() {
        assert_eq!(rewrite_unspecified("not-an-addr", &[]), "not-an-addr");
    }
}
