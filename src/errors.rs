// Error types
//
// `RendezvousError` covers setup failures that abort the process.
// `CandidateError` covers malformed discovery entries, which are only logged.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Fatal rendezvous errors. Without a bound listener or a registered
/// advertisement the peer can never find us, so none of these are retried.
#[derive(Debug, Error)]
pub enum RendezvousError {
    #[error("rendezvous name must be at least {min} characters after trimming whitespace")]
    InvalidName { min: usize },

    #[error("failed to bind local endpoint on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to start discovery transport: {0}")]
    Transport(String),

    #[error("failed to register advertisement `{instance}`: {reason}")]
    Advertise { instance: String, reason: String },

    #[error("failed to browse for `{service_type}`: {reason}")]
    Browse {
        service_type: String,
        reason: String,
    },

    #[error("rendezvous ended without establishing a connection")]
    Abandoned,
}

/// A discovered entry that cannot be evaluated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CandidateError {
    #[error("candidate `{instance}` is missing the `{field}` field")]
    MissingField {
        instance: String,
        field: &'static str,
    },

    #[error("candidate `{instance}` advertises unparseable address `{address}`")]
    BadAddress { instance: String, address: String },
}
