//! Per-connection handling for the video and audio channels: the only
//! requests these connections understand are their own subscribe/
//! unsubscribe pair (spec.md's data model makes subscription a property of
//! the client's own connection, not something routed through the control
//! handler). Anything else is a protocol error that closes the
//! connection.

use std::sync::Arc;

use aesp_wire::{Frame, MessageType};
use net_io::ClientId;
use tokio::sync::mpsc;

use crate::dispatcher::ChannelDispatcher;
use crate::wire::error_payload;
use aesp_proto::ErrorKind;

/// Drains decoded frames for one video/audio connection until it closes or
/// sends something other than its subscribe/unsubscribe pair. Deregistering
/// the client from `dispatcher` is the caller's responsibility once this
/// returns, matching how the connection's reader/writer tasks are also
/// torn down by the caller.
pub async fn run(
    dispatcher: Arc<ChannelDispatcher>,
    client: ClientId,
    mut frames: mpsc::Receiver<(ClientId, Frame)>,
    subscribe: MessageType,
    unsubscribe: MessageType,
) {
    while let Some((sender, frame)) = frames.recv().await {
        debug_assert_eq!(sender, client);
        if frame.kind == subscribe {
            dispatcher.set_subscribed(client, true);
            dispatcher.send_to(client, MessageType::Ack, &[]).await;
        } else if frame.kind == unsubscribe {
            dispatcher.set_subscribed(client, false);
            dispatcher.send_to(client, MessageType::Ack, &[]).await;
        } else {
            let message = format!("{:?} is not valid on this channel", frame.kind);
            dispatcher
                .send_to(
                    client,
                    MessageType::Error,
                    &error_payload(ErrorKind::Protocol, &message),
                )
                .await;
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use net_io::QueuePolicy;

    use super::*;

    #[tokio::test]
    async fn subscribe_then_unsubscribe_flips_the_flag_and_acks_each_time() {
        let dispatcher = Arc::new(ChannelDispatcher::new(4, QueuePolicy::DropOldest));
        let client = ClientId::next();
        let queue = dispatcher.register(client, false);
        let (tx, rx) = mpsc::channel(4);

        tx.send((client, Frame::new(MessageType::VideoSubscribe, Bytes::new())))
            .await
            .unwrap();
        tx.send((client, Frame::new(MessageType::VideoUnsubscribe, Bytes::new())))
            .await
            .unwrap();
        drop(tx);

        run(
            dispatcher.clone(),
            client,
            rx,
            MessageType::VideoSubscribe,
            MessageType::VideoUnsubscribe,
        )
        .await;

        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn an_unrelated_frame_sends_an_error_and_stops_the_loop() {
        let dispatcher = Arc::new(ChannelDispatcher::new(4, QueuePolicy::DropOldest));
        let client = ClientId::next();
        let queue = dispatcher.register(client, false);
        let (tx, rx) = mpsc::channel(4);

        tx.send((client, Frame::new(MessageType::Ping, Bytes::new())))
            .await
            .unwrap();

        run(
            dispatcher.clone(),
            client,
            rx,
            MessageType::AudioSubscribe,
            MessageType::AudioUnsubscribe,
        )
        .await;

        assert_eq!(queue.len(), 1);
    }
}
