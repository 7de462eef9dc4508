//! Per-connection handling: one request, one response, then close.

use std::net::SocketAddr;
use std::sync::Arc;

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::constants::{READ_TIMEOUT, WRITE_TIMEOUT};
use crate::protocol::{Incoming, Response, read_request};
use crate::router::Router;
use crate::{Error, Result};

/// Serve a single exchange on `stream`.
///
/// Read failures and timeouts close the connection without a response.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    router: Arc<Router>,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let incoming = tokio::time::timeout(READ_TIMEOUT, read_request(&mut reader))
        .await
        .map_err(|_| Error::ReadTimeout)??;

    let response = match incoming {
        Incoming::Closed => {
            tracing::debug!("{} closed without a request", addr);
            return Ok(());
        }
        Incoming::Malformed => Response::plain(400, "bad request"),
        Incoming::Request(request) => {
            let response = router.route(&request).await;
            tracing::debug!(
                "{} {} {} -> {}",
                addr,
                request.method,
                request.path,
                response.status
            );
            response
        }
    };

    write_response(&mut write_half, &response, WRITE_TIMEOUT).await
}

/// Write `response` and close the write side, giving up after `limit`.
pub(crate) async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    limit: Duration,
) -> Result<()> {
    let bytes = response.to_bytes();
    let write = async {
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        writer.shutdown().await
    };
    tokio::time::timeout(limit, write)
        .await
        .map_err(|_| Error::WriteTimeout)??;
    Ok(())
}
