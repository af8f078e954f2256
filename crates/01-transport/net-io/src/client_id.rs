use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque per-connection client identifier, unique for the life of the
/// server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

static NEXT: AtomicU64 = AtomicU64::new(1);

impl ClientId {
    /// Allocates the next client id. Ids are never reused within a process
    /// lifetime, so a stale id from a disconnected client can never alias a
    /// freshly accepted one.
    pub fn next() -> Self {
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}
