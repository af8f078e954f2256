use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::outbound_queue::OutboundQueue;

/// Pulls encoded frames from `queue` and writes them to `stream` until the
/// queue closes or the socket errors out.
pub async fn writer_loop<W>(mut stream: W, queue: Arc<OutboundQueue>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = queue.pop().await {
        if let Err(err) = stream.write_all(&bytes).await {
            debug!(%err, "writer stream closed");
            queue.close();
            break;
        }
    }
    let _ = stream.shutdown().await;
}
