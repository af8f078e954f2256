//! Video/audio channels never block a slow client: once its queue fills,
//! further frames evict the oldest one rather than applying back-pressure.

use aesp_wire::MessageType;
use net_io::{ClientId, QueuePolicy};
use orchestrator::ChannelDispatcher;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn broadcasting_past_capacity_drops_the_oldest_frames() {
    let dispatcher = ChannelDispatcher::new(2, QueuePolicy::DropOldest);
    let client = ClientId::next();
    let queue = dispatcher.register(client, true);

    for _ in 0..5 {
        dispatcher.broadcast(MessageType::FrameRaw, &[0u8; 4], true).await;
    }

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.dropped_count(), 3);
}

#[tokio::test]
async fn an_unsubscribed_client_is_skipped_by_a_subscribed_only_broadcast() {
    let dispatcher = ChannelDispatcher::new(4, QueuePolicy::DropOldest);
    let client = ClientId::next();
    let queue = dispatcher.register(client, false);

    dispatcher.broadcast(MessageType::FrameRaw, &[0u8; 4], true).await;

    assert!(queue.is_empty());
    assert_eq!(queue.dropped_count(), 0);
}
