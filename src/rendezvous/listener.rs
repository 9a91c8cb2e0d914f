// Listener
//
// Owns the local endpoint: an ephemeral TCP port bound once at startup.
// The accept loop ends when a peer connects or the rendezvous is decided
// elsewhere, at which point the socket is dropped.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::RendezvousError;

/// Pause after a failed accept (e.g. descriptor exhaustion) before retrying.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind an ephemeral port on `ip`. Failure is fatal.
    pub async fn bind(ip: IpAddr) -> Result<Self, RendezvousError> {
        let requested = SocketAddr::new(ip, 0);
        let bind_err = |source| RendezvousError::Bind {
            addr: requested,
            source,
        };

        let inner = TcpListener::bind(requested).await.map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        debug!(%local_addr, "Listening");
        Ok(Self { inner, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Accept one connection, or return `None` once `cancel` fires.
    ///
    /// Consumes the listener: the socket is closed on return either way, so
    /// no second peer can connect after the first accept or after a dial-out
    /// win.
    pub async fn accept_until(self, cancel: CancellationToken) -> Option<(TcpStream, SocketAddr)> {
        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(local_addr = %self.local_addr, "Listener closed");
                    return None;
                }
                accepted = self.inner.accept() => accepted,
            };

            match accepted {
                Ok(conn) => return Some(conn),
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    tokio::select! {
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => {}
                    }
                }
            }
        }
    }
}
