use std::collections::HashMap;
use std::hash::Hash;

/// One client's pending, unsolicited event. Holds at most one event; a
/// second arriving before the first is drained coalesces into it and
/// bumps `lost_count` so the client can tell its view was incomplete.
pub struct EventBuffer<E> {
    pending: Option<E>,
    lost_count: u32,
}

impl<E> Default for EventBuffer<E> {
    fn default() -> Self {
        Self {
            pending: None,
            lost_count: 0,
        }
    }
}

impl<E> EventBuffer<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: E) {
        if self.pending.is_some() {
            self.lost_count += 1;
        }
        self.pending = Some(event);
    }

    pub fn take(&mut self) -> Option<(E, u32)> {
        let event = self.pending.take()?;
        let lost = std::mem::take(&mut self.lost_count);
        Some((event, lost))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

/// Per-client event buffers, keyed by whatever client identifier the
/// caller uses and generic over the event payload, so both the debugger's
/// own breakpoint/stop events and a higher layer's broader notification
/// type (e.g. the orchestrator's halt reasons) can share this coalescing
/// discipline. Kept generic over the key as well so this crate does not
/// need to know about connections or sockets.
pub struct EventSink<K: Eq + Hash + Copy, E: Clone> {
    buffers: HashMap<K, EventBuffer<E>>,
}

impl<K: Eq + Hash + Copy, E: Clone> Default for EventSink<K, E> {
    fn default() -> Self {
        Self {
            buffers: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Copy, E: Clone> EventSink<K, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: K) {
        self.buffers.entry(client).or_insert_with(EventBuffer::new);
    }

    pub fn deregister(&mut self, client: &K) {
        self.buffers.remove(client);
    }

    /// Delivers `event` to every registered client's own buffer. A
    /// client whose buffer already held an undrained event coalesces
    /// rather than loses the earlier one.
    pub fn publish(&mut self, event: &E) {
        for buffer in self.buffers.values_mut() {
            buffer.push(event.clone());
        }
    }

    pub fn drain(&mut self, client: &K) -> Option<(E, u32)> {
        self.buffers.get_mut(client)?.take()
    }
}
