// Rendezvous: pair two instances by name and elect who dials
//
// `Rendezvous::connect` is the entry point; the submodules are its parts.

pub mod dial;
pub mod election;
pub mod listener;
pub mod name;
pub mod session;

pub use election::{evaluate, ElectionState, IgnoreReason, Role, Verdict};
pub use listener::Listener;
pub use name::RendezvousName;
pub use session::{Established, Rendezvous};
