// Rendezvous session
//
// Wires the listener, advertiser, discoverer and election together and
// returns the one connection that won the race.
//
// Three tasks run until the rendezvous is decided:
//   - accept path: waits on the listener
//   - discovery:   polls the transport into the candidate queue
//   - dial path:   evaluates candidates and dials the ones we must initiate
// Both connection-producing paths hand their socket to the `Arbiter`, which
// lets exactly one through and tears everything else down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dial::dial;
use super::election::{evaluate, ElectionState, IgnoreReason, Role, Verdict};
use super::listener::Listener;
use super::RendezvousName;
use crate::config::Config;
use crate::errors::RendezvousError;
use crate::service::{
    candidate_queue, local_hostname, Advertisement, Advertiser, CandidateReceiver, Discoverer,
    DiscoveryTransport,
};

/// The live connection and how we got it.
#[derive(Debug)]
pub struct Established<S = TcpStream> {
    pub role: Role,
    pub peer: SocketAddr,
    pub stream: S,
}

/// Single-winner gate between the accept path and the dial path.
struct Arbiter<S> {
    election: ElectionState,
    cancel: CancellationToken,
    release: Box<dyn Fn() + Send + Sync>,
    winner: mpsc::Sender<Established<S>>,
}

impl<S> Arbiter<S> {
    fn new(
        cancel: CancellationToken,
        release: Box<dyn Fn() + Send + Sync>,
        winner: mpsc::Sender<Established<S>>,
    ) -> Self {
        Self {
            election: ElectionState::new(),
            cancel,
            release,
            winner,
        }
    }

    /// Offer a freshly opened connection. The first caller wins: it stops
    /// the listener and the poller, withdraws the advertisement and hands
    /// the connection over. Every later caller drops (closes) its
    /// connection. Returns whether this call won.
    fn settle(&self, conn: Established<S>) -> bool {
        if !self.election.try_decide() {
            debug!(
                role = %conn.role,
                peer = %conn.peer,
                "Rendezvous already decided, closing connection"
            );
            return false;
        }

        self.cancel.cancel();
        (self.release)();

        info!(role = %conn.role, peer = %conn.peer, "Rendezvous decided");
        if self.winner.try_send(conn).is_err() {
            warn!("Rendezvous owner went away, dropping connection");
        }
        true
    }
}

/// One rendezvous attempt under a given name.
pub struct Rendezvous<T: DiscoveryTransport> {
    name: RendezvousName,
    config: Config,
    transport: Arc<T>,
}

impl<T: DiscoveryTransport> Rendezvous<T> {
    pub fn new(name: RendezvousName, config: Config, transport: Arc<T>) -> Self {
        Self {
            name,
            config,
            transport,
        }
    }

    /// Bind, advertise, discover and race until exactly one connection is
    /// established.
    ///
    /// Only setup failures (bind, advertise) are errors. Unreachable or
    /// malformed candidates are logged and discovery carries on. Dropping
    /// the returned future cancels every background task and withdraws the
    /// advertisement.
    pub async fn connect(self) -> Result<Established, RendezvousError> {
        let listener = Listener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr();
        let own_port = listener.port();

        let ad = Advertisement {
            service_type: self.config.service_type.clone(),
            instance: format!("{}-{}", local_hostname(), own_port),
            port: own_port,
            address: local_addr.to_string(),
            name: self.name.to_string(),
        };
        let advertiser = Arc::new(Advertiser::start(self.transport.clone(), &ad)?);

        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        let release = {
            let advertiser = advertiser.clone();
            let transport = self.transport.clone();
            move || {
                advertiser.stop();
                transport.shutdown();
            }
        };
        let (winner_tx, mut winner_rx) = mpsc::channel(1);
        let arbiter = Arc::new(Arbiter::new(cancel.clone(), Box::new(release), winner_tx));

        let (queue_tx, queue_rx) = candidate_queue(self.config.queue_capacity);
        let discoverer = Discoverer::new(
            self.transport.clone(),
            self.config.service_type.clone(),
            self.config.poll_interval(),
        );
        tokio::spawn(discoverer.run(queue_tx, cancel.clone()));

        tokio::spawn(dial_path(
            queue_rx,
            DialContext {
                name: self.name.clone(),
                own_port,
                dial_timeout: self.config.dial_timeout(),
            },
            arbiter.clone(),
            cancel.clone(),
        ));

        tokio::spawn(accept_path(listener, arbiter, cancel.clone()));

        info!(name = %self.name, %local_addr, "Waiting for peer");

        winner_rx.recv().await.ok_or(RendezvousError::Abandoned)
    }
}

struct DialContext {
    name: RendezvousName,
    own_port: u16,
    dial_timeout: std::time::Duration,
}

async fn accept_path(
    listener: Listener,
    arbiter: Arc<Arbiter<TcpStream>>,
    cancel: CancellationToken,
) {
    if let Some((stream, peer)) = listener.accept_until(cancel).await {
        arbiter.settle(Established {
            role: Role::Responder,
            peer,
            stream,
        });
    }
}

async fn dial_path(
    mut queue: CandidateReceiver,
    ctx: DialContext,
    arbiter: Arc<Arbiter<TcpStream>>,
    cancel: CancellationToken,
) {
    loop {
        let entry = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            entry = queue.next() => match entry {
                Some(entry) => entry,
                None => return,
            },
        };

        let target = match evaluate(&entry, &ctx.name, ctx.own_port) {
            Ok(Verdict::Dial(target)) => target,
            Ok(Verdict::Ignore(IgnoreReason::NameMismatch)) => continue,
            Ok(Verdict::Ignore(reason)) => {
                debug!(instance = %entry.instance, ?reason, "Not dialling candidate");
                continue;
            }
            Err(e) => {
                debug!("Skipping candidate: {}", e);
                continue;
            }
        };

        debug!(%target, "Dialling candidate");
        let stream = match dial(target, ctx.dial_timeout).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to connect to {}: {}", target, e);
                continue;
            }
        };

        // Won or lost, a completed dial ends this path.
        arbiter.settle(Established {
            role: Role::Initiator,
            peer: target,
            stream,
        });
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::DuplexStream;

    fn arbiter(
        releases: Arc<AtomicUsize>,
    ) -> (
        Arc<Arbiter<DuplexStream>>,
        mpsc::Receiver<Established<DuplexStream>>,
        CancellationToken,
    ) {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(1);
        let release = Box::new(move || {
            releases.fetch_add(1, Ordering::SeqCst);
        });
        (Arc::new(Arbiter::new(cancel.clone(), release, tx)), rx, cancel)
    }

    fn conn(role: Role, port: u16) -> (Established<DuplexStream>, DuplexStream) {
        let (local, remote) = tokio::io::duplex(64);
        let est = Established {
            role,
            peer: SocketAddr::from(([127, 0, 0, 1], port)),
            stream: local,
        };
        (est, remote)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_completions_start_one_pipe() {
        let releases = Arc::new(AtomicUsize::new(0));
        let (arbiter, mut winners, cancel) = arbiter(releases.clone());

        let handles: Vec<_> = (0..64u16)
            .map(|i| {
                let arbiter = arbiter.clone();
                tokio::spawn(async move {
                    let role = if i % 2 == 0 { Role::Initiator } else { Role::Responder };
                    let (est, remote) = conn(role, 50000 + i);
                    (arbiter.settle(est), remote)
                })
            })
            .collect();

        let mut wins = 0;
        let mut remotes = Vec::new();
        for handle in handles {
            let (won, remote) = handle.await.unwrap();
            wins += usize::from(won);
            remotes.push(remote);
        }
        drop(arbiter);

        assert_eq!(wins, 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(cancel.is_cancelled());

        // Exactly one connection reaches the pipe.
        assert!(winners.recv().await.is_some());
        assert!(winners.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_loser_connection_is_closed() {
        use tokio::io::AsyncReadExt;

        let releases = Arc::new(AtomicUsize::new(0));
        let (arbiter, _winners, _cancel) = arbiter(releases);

        let (first, _first_remote) = conn(Role::Responder, 1);
        let (second, mut second_remote) = conn(Role::Initiator, 2);
        assert!(arbiter.settle(first));
        assert!(!arbiter.settle(second));

        // The losing side's peer sees EOF.
        let mut buf = [0u8; 8];
        assert_eq!(second_remote.read(&mut buf).await.unwrap(), 0);
    }
}
