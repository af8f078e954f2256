use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Back-pressure policy applied when [`OutboundQueue::push`] finds the
/// queue at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Control channels: the pusher waits for room rather than losing data.
    Block,
    /// Video/audio channels: the oldest queued item is dropped to admit
    /// the new one. Consumers of these channels prefer current state over
    /// completeness.
    DropOldest,
}

/// A bounded, per-client outbound frame queue, owned by the channel
/// dispatcher. The writer task is its sole consumer.
pub struct OutboundQueue {
    inner: Mutex<VecDeque<Bytes>>,
    capacity: usize,
    policy: QueuePolicy,
    not_empty: Notify,
    not_full: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl OutboundQueue {
    pub fn new(capacity: usize, policy: QueuePolicy) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
            not_empty: Notify::new(),
            not_full: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueues a frame, applying this queue's back-pressure policy.
    ///
    /// Under [`QueuePolicy::Block`] this awaits room rather than dropping.
    /// Under [`QueuePolicy::DropOldest`] it never awaits: it evicts the
    /// oldest queued frame first if the queue is full, incrementing the
    /// drop counter exposed via [`OutboundQueue::dropped_count`].
    pub async fn push(&self, item: Bytes) {
        loop {
            {
                let mut guard = self.inner.lock();
                if self.closed.load(Ordering::Acquire) {
                    return;
                }
                if guard.len() < self.capacity {
                    guard.push_back(item);
                    drop(guard);
                    self.not_empty.notify_one();
                    return;
                }
                match self.policy {
                    QueuePolicy::DropOldest => {
                        guard.pop_front();
                        guard.push_back(item);
                        drop(guard);
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        self.not_empty.notify_one();
                        return;
                    }
                    QueuePolicy::Block => {
                        // fall through to wait below
                    }
                }
            }
            self.not_full.notified().await;
        }
    }

    /// Waits for and removes the next queued frame, or `None` once the
    /// queue has been closed and drained.
    pub async fn pop(&self) -> Option<Bytes> {
        loop {
            {
                let mut guard = self.inner.lock();
                if let Some(item) = guard.pop_front() {
                    drop(guard);
                    self.not_full.notify_one();
                    return Some(item);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            self.not_empty.notified().await;
        }
    }

    /// Marks the queue closed and wakes any waiters; used when a client
    /// disconnects so its reader/writer tasks can unwind promptly.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    /// Drains and discards everything queued; used when a client
    /// disconnects so stale frames don't linger for a reused slot.
    pub fn drain_and_discard(&self) {
        self.inner.lock().clear();
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
