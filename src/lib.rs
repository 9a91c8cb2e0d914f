// Lanpipe - pipe stdin/stdout between two instances paired over mDNS
// Library exports

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod pipe;
pub mod rendezvous;
pub mod service;

pub use errors::{CandidateError, RendezvousError};
pub use rendezvous::{Established, Rendezvous, RendezvousName, Role};
