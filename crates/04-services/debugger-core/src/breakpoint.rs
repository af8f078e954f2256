use std::collections::HashMap;

use smallvec::SmallVec;

use aesp_proto::BreakpointInfo;

/// Whether a breakpoint is realized as a substituted trap opcode or a
/// polled program-counter watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointKind {
    Substituted,
    Watched,
}

#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub kind: BreakpointKind,
    pub saved_byte: Option<u8>,
    pub hit_count: u32,
    pub enabled: bool,
}

/// A temporary breakpoint installed for step-over's return address or
/// run-until's target. At most one exists at a time.
#[derive(Debug, Clone, Copy)]
pub struct TemporaryBreakpoint {
    pub address: u16,
    pub kind: BreakpointKind,
    pub saved_byte: Option<u8>,
}

#[derive(Debug, Default)]
pub struct BreakpointTable {
    entries: HashMap<u16, Breakpoint>,
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, addr: u16) -> bool {
        self.entries.contains_key(&addr)
    }

    pub fn get(&self, addr: u16) -> Option<&Breakpoint> {
        self.entries.get(&addr)
    }

    pub fn get_mut(&mut self, addr: u16) -> Option<&mut Breakpoint> {
        self.entries.get_mut(&addr)
    }

    pub fn insert(&mut self, addr: u16, bp: Breakpoint) {
        self.entries.insert(addr, bp);
    }

    pub fn remove(&mut self, addr: u16) -> Option<Breakpoint> {
        self.entries.remove(&addr)
    }

    pub fn addresses(&self) -> SmallVec<[u16; 8]> {
        self.entries.keys().copied().collect()
    }

    pub fn list(&self) -> SmallVec<[BreakpointInfo; 8]> {
        self.entries
            .iter()
            .map(|(addr, bp)| BreakpointInfo {
                address: *addr,
                watched: bp.kind == BreakpointKind::Watched,
                enabled: bp.enabled,
                hit_count: bp.hit_count,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
