// Project-wide constants
//
// Centralised here so the service type, TXT keys and timing defaults have one
// source of truth. Import via `use crate::config::constants::*;`.

use std::time::Duration;

/// mDNS service type every instance advertises and browses.
pub const SERVICE_TYPE: &str = "_lanpipe._tcp.local.";

/// TXT key carrying the listener's `ip:port`.
pub const TXT_ADDR: &str = "addr";

/// TXT key carrying the rendezvous name.
pub const TXT_NAME: &str = "name";

/// TXT key carrying the crate version of the advertiser.
pub const TXT_VERSION: &str = "version";

/// Minimum rendezvous name length, counted in characters after trimming.
pub const MIN_NAME_LEN: usize = 2;

/// Default listener address. Loopback pairs instances on one host; set
/// `bind_addr = "0.0.0.0"` to pair across the LAN.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Delay between discovery rounds.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long one discovery round listens for answers.
pub const DEFAULT_LOOKUP_WINDOW: Duration = Duration::from_secs(1);

/// Upper bound on a single outgoing connect attempt.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the discovery → election queue. Oldest entries are dropped
/// when it is full.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
