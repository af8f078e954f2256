use std::sync::Arc;

use aesp_wire::{decode, encode, Frame, FrameError, MessageType};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client_id::ClientId;
use crate::outbound_queue::OutboundQueue;

/// Reads frames from one connection until EOF, a codec error, or channel
/// closure, handing each decoded frame to `sink` tagged with `client`.
///
/// On a codec error this pushes an `Error` frame onto `errors` (the
/// client's own writer queue) before returning and closing the
/// connection.
pub async fn reader_loop<R>(
    mut stream: R,
    client: ClientId,
    sink: mpsc::Sender<(ClientId, Frame)>,
    errors: Arc<OutboundQueue>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match decode(&mut stream).await {
            Ok(frame) => {
                debug!(?client, kind = ?frame.kind, "decoded frame");
                if sink.send((client, frame)).await.is_err() {
                    break;
                }
            }
            Err(FrameError::Truncated) => {
                debug!(?client, "connection closed");
                break;
            }
            Err(err) => {
                warn!(?client, %err, "frame decode error, closing connection");
                let message = err.to_string();
                let payload = encode_error_payload(&message);
                errors
                    .push(encode(MessageType::Error, &payload))
                    .await;
                break;
            }
        }
    }
    errors.close();
}

fn encode_error_payload(message: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + message.len());
    out.push(0u8); // kind 0: protocol error (no finer-grained kind needed at the frame layer)
    out.extend_from_slice(message.as_bytes());
    out
}
