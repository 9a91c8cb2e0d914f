// Configuration structs

use super::constants::*;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Runtime configuration. Every field has a default, so an empty or missing
/// config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the listener binds (port is always ephemeral)
    pub bind_addr: IpAddr,

    /// Delay between discovery rounds, in milliseconds
    pub poll_interval_ms: u64,

    /// How long one discovery round collects answers, in milliseconds
    pub lookup_window_ms: u64,

    /// Upper bound on one outgoing connect attempt, in milliseconds
    pub dial_timeout_ms: u64,

    /// Capacity of the discovery → election queue
    pub queue_capacity: usize,

    /// mDNS service type to advertise and browse
    pub service_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or(IpAddr::from([127, 0, 0, 1])),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            lookup_window_ms: DEFAULT_LOOKUP_WINDOW.as_millis() as u64,
            dial_timeout_ms: DEFAULT_DIAL_TIMEOUT.as_millis() as u64,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            service_type: SERVICE_TYPE.to_string(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lookup_window(&self) -> Duration {
        Duration::from_millis(self.lookup_window_ms)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    /// Reject values that would stall discovery or disable the queue.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.lookup_window_ms == 0 {
            bail!("lookup_window_ms must be greater than zero");
        }
        if self.dial_timeout_ms == 0 {
            bail!("dial_timeout_ms must be greater than zero");
        }
        if self.queue_capacity == 0 {
            bail!("queue_capacity must be greater than zero");
        }
        if !self.service_type.starts_with('_') || !self.service_type.ends_with(".local.") {
            bail!(
                "service_type `{}` must look like `_name._tcp.local.`",
                self.service_type
            );
        }
        Ok(())
    }
}
