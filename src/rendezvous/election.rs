// Election
//
// Decides, per discovered entry, whether this instance dials out, and
// arbitrates the local race between the dial path and the accept path.
//
// Two rules carry all of the correctness:
//   1. Port tie-break: dial only when the candidate's advertised port is
//      strictly greater than our own. Between two genuine peers exactly one
//      side (the lower port) dials; our own echoed advertisement has an equal
//      port and is never dialled.
//   2. Decide-once flag: whichever local path completes a connection first
//      claims the flag; every later completion closes its socket.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use super::RendezvousName;
use crate::errors::CandidateError;
use crate::service::CandidateEntry;

/// Decide-once flag shared by every path that may produce a connection.
#[derive(Debug, Default)]
pub struct ElectionState {
    decided: AtomicBool,
}

impl ElectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt the single not-decided → decided transition. Returns true
    /// iff this call made it; every other call, concurrent or later, sees
    /// false.
    pub fn try_decide(&self) -> bool {
        self.decided
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Which side of the connection this instance ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Dialled the peer (our port is the lower one)
    Initiator,
    /// Accepted the peer's dial
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

/// Outcome of evaluating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Dial(SocketAddr),
    Ignore(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Advertised under a different rendezvous name
    NameMismatch,
    /// Our own advertisement echoed back (equal port)
    SelfEcho,
    /// Peer has the lower port and will dial us
    PeerInitiates,
}

/// Evaluate a candidate against our name and listener port.
///
/// Entries missing a field are reported as errors so the caller can log
/// them; a wrong name is a silent ignore. The `<=` boundary is intentional:
/// equal ports never dial, which is the only thing keeping an instance from
/// connecting to itself.
pub fn evaluate(
    entry: &CandidateEntry,
    name: &RendezvousName,
    own_port: u16,
) -> Result<Verdict, CandidateError> {
    let Some(address) = entry.address.as_deref() else {
        return Err(CandidateError::MissingField {
            instance: entry.instance.clone(),
            field: "addr",
        });
    };
    let Some(advertised_name) = entry.name.as_deref() else {
        return Err(CandidateError::MissingField {
            instance: entry.instance.clone(),
            field: "name",
        });
    };

    if advertised_name != name.as_str() {
        return Ok(Verdict::Ignore(IgnoreReason::NameMismatch));
    }

    let target: SocketAddr = address
        .trim()
        .parse()
        .map_err(|_| CandidateError::BadAddress {
            instance: entry.instance.clone(),
            address: address.to_string(),
        })?;

    let candidate_port = target.port();
    if candidate_port == own_port {
        return Ok(Verdict::Ignore(IgnoreReason::SelfEcho));
    }
    if candidate_port < own_port {
        return Ok(Verdict::Ignore(IgnoreReason::PeerInitiates));
    }
    Ok(Verdict::Dial(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn demo() -> RendezvousName {
        RendezvousName::parse("demo").unwrap()
    }

    fn entry(address: &str, name: &str) -> CandidateEntry {
        CandidateEntry::new("peer", address, name)
    }

    #[test]
    fn test_higher_port_is_dialled() {
        let verdict = evaluate(&entry("127.0.0.1:51200", "demo"), &demo(), 51000).unwrap();
        assert_eq!(verdict, Verdict::Dial("127.0.0.1:51200".parse().unwrap()));
    }

    #[test]
    fn test_lower_port_waits_for_peer() {
        let verdict = evaluate(&entry("127.0.0.1:51000", "demo"), &demo(), 51200).unwrap();
        assert_eq!(verdict, Verdict::Ignore(IgnoreReason::PeerInitiates));
    }

    #[test]
    fn test_self_echo_never_dials() {
        let verdict = evaluate(&entry("127.0.0.1:51000", "demo"), &demo(), 51000).unwrap();
        assert_eq!(verdict, Verdict::Ignore(IgnoreReason::SelfEcho));
    }

    #[test]
    fn test_other_name_never_dials() {
        // Even with a port that would otherwise win the tie-break.
        let verdict = evaluate(&entry("127.0.0.1:60000", "other"), &demo(), 51000).unwrap();
        assert_eq!(verdict, Verdict::Ignore(IgnoreReason::NameMismatch));
    }

    #[test]
    fn test_name_compared_exactly() {
        let verdict = evaluate(&entry("127.0.0.1:60000", "Demo"), &demo(), 51000).unwrap();
        assert_eq!(verdict, Verdict::Ignore(IgnoreReason::NameMismatch));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let no_addr = CandidateEntry {
            instance: "peer".to_string(),
            address: None,
            name: Some("demo".to_string()),
        };
        let no_name = CandidateEntry {
            instance: "peer".to_string(),
            address: Some("127.0.0.1:60000".to_string()),
            name: None,
        };
        assert!(matches!(
            evaluate(&no_addr, &demo(), 51000),
            Err(CandidateError::MissingField { field: "addr", .. })
        ));
        assert!(matches!(
            evaluate(&no_name, &demo(), 51000),
            Err(CandidateError::MissingField { field: "name", .. })
        ));
    }

    #[test]
    fn test_unparseable_address_rejected() {
        let result = evaluate(&entry("somewhere", "demo"), &demo(), 51000);
        assert!(matches!(result, Err(CandidateError::BadAddress { .. })));
    }

    #[test]
    fn test_scenario_exactly_one_initiator() {
        // A on 51000, B on 51200, both named "demo".
        let a = entry("127.0.0.1:51000", "demo");
        let b = entry("127.0.0.1:51200", "demo");

        let b_sees_a = evaluate(&a, &demo(), 51200).unwrap();
        let a_sees_b = evaluate(&b, &demo(), 51000).unwrap();

        assert_eq!(b_sees_a, Verdict::Ignore(IgnoreReason::PeerInitiates));
        assert_eq!(a_sees_b, Verdict::Dial("127.0.0.1:51200".parse().unwrap()));
    }

    #[test]
    fn test_try_decide_succeeds_once() {
        let state = ElectionState::new();
        assert!(state.try_decide());
        assert!(!state.try_decide());
        assert!(!state.try_decide());
    }

    #[test]
    fn test_concurrent_try_decide_has_one_winner() {
        let state = Arc::new(ElectionState::new());
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let state = state.clone();
                let wins = wins.clone();
                std::thread::spawn(move || {
                    if state.try_decide() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Initiator.to_string(), "initiator");
        assert_eq!(Role::Responder.to_string(), "responder");
    }
}
