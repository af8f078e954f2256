use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aesp_wire::{encode, MessageType};
use net_io::{ClientId, OutboundQueue, QueuePolicy};
use parking_lot::Mutex;

/// A single connected client as the dispatcher sees it: its outbound
/// queue and, for video/audio channels, whether it has asked to receive
/// broadcasts.
struct RegisteredClient {
    queue: Arc<OutboundQueue>,
    subscribed: AtomicBool,
}

/// Owns one channel's client registry and fan-out. Registration and
/// broadcast share a lock, held only long enough to snapshot the queues
/// to push to — never across the `push` itself, since `Block`-policy
/// queues can suspend waiting for room.
pub struct ChannelDispatcher {
    clients: Mutex<HashMap<ClientId, Arc<RegisteredClient>>>,
    queue_capacity: usize,
    policy: QueuePolicy,
}

impl ChannelDispatcher {
    pub fn new(queue_capacity: usize, policy: QueuePolicy) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            queue_capacity,
            policy,
        }
    }

    /// Registers a newly accepted connection, returning the queue its
    /// writer task should drain. `subscribed` is the channel's default
    /// (control clients are implicitly always addressable; video/audio
    /// clients start unsubscribed until they ask).
    pub fn register(&self, id: ClientId, subscribed: bool) -> Arc<OutboundQueue> {
        let queue = Arc::new(OutboundQueue::new(self.queue_capacity, self.policy));
        self.clients.lock().insert(
            id,
            Arc::new(RegisteredClient {
                queue: Arc::clone(&queue),
                subscribed: AtomicBool::new(subscribed),
            }),
        );
        queue
    }

    pub fn deregister(&self, id: ClientId) {
        if let Some(client) = self.clients.lock().remove(&id) {
            client.queue.close();
            client.queue.drain_and_discard();
        }
    }

    pub fn set_subscribed(&self, id: ClientId, subscribed: bool) {
        if let Some(client) = self.clients.lock().get(&id) {
            client.subscribed.store(subscribed, Ordering::Release);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Sends `frame` to one client directly, bypassing subscription —
    /// used for per-request replies rather than broadcasts.
    pub async fn send_to(&self, id: ClientId, kind: MessageType, payload: &[u8]) {
        let queue = self.clients.lock().get(&id).map(|c| Arc::clone(&c.queue));
        if let Some(queue) = queue {
            queue.push(encode(kind, payload)).await;
        }
    }

    /// Broadcasts to every client, or only subscribed ones when
    /// `only_subscribed` is set (video/audio channels).
    pub async fn broadcast(&self, kind: MessageType, payload: &[u8], only_subscribed: bool) {
        let bytes = encode(kind, payload);
        let targets: Vec<Arc<OutboundQueue>> = {
            let clients = self.clients.lock();
            clients
                .values()
                .filter(|c| !only_subscribed || c.subscribed.load(Ordering::Acquire))
                .map(|c| Arc::clone(&c.queue))
                .collect()
        };
        for queue in targets {
            queue.push(bytes.clone()).await;
        }
    }
}
