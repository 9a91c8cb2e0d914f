// Duplex pipe
//
// Bridges process I/O and the established connection: local input is copied
// to the connection and connection data to local output, concurrently. The
// pipe finishes only when both directions have finished, so local EOF never
// cuts off data still arriving from the peer.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

const BUFFER_SIZE: usize = 8 * 1024;

/// Bytes moved in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeReport {
    /// Local input → connection
    pub sent: u64,
    /// Connection → local output
    pub received: u64,
}

/// Run both copy loops over `stream` until each has finished.
///
/// A direction finishes on EOF or on any I/O error; errors are not reported
/// as failures. When local input is exhausted the connection's write half is
/// shut down so the peer's read loop sees EOF.
pub async fn run<S, I, O>(stream: S, input: I, output: O) -> PipeReport
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    I: AsyncRead + Unpin + Send + 'static,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let (mut conn_read, mut conn_write) = tokio::io::split(stream);
    let mut input = input;
    let mut output = output;

    let outbound = tokio::spawn(async move {
        let sent = pump(&mut input, &mut conn_write).await;
        if let Err(e) = conn_write.shutdown().await {
            debug!("Failed to shut down connection write half: {}", e);
        }
        debug!(bytes = sent, "Outbound copy finished");
        sent
    });

    let inbound = tokio::spawn(async move {
        let received = pump(&mut conn_read, &mut output).await;
        debug!(bytes = received, "Inbound copy finished");
        received
    });

    let (sent, received) = tokio::join!(outbound, inbound);

    PipeReport {
        sent: sent.unwrap_or_else(|e| {
            debug!("Outbound copy task failed: {}", e);
            0
        }),
        received: received.unwrap_or_else(|e| {
            debug!("Inbound copy task failed: {}", e);
            0
        }),
    }
}

/// Copy until EOF or error, flushing after every chunk so interactive
/// output shows up immediately. Returns the bytes written.
async fn pump<R, W>(reader: &mut R, writer: &mut W) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("Read ended with error: {}", e);
                break;
            }
        };
        if let Err(e) = writer.write_all(&buf[..n]).await {
            debug!("Write ended with error: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            debug!("Flush ended with error: {}", e);
            break;
        }
        total += n as u64;
    }

    total
}
