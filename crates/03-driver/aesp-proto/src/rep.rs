use aesp_wire::payloads::RegisterFile;

use crate::error::ErrorKind;

/// A breakpoint as reported to a client, including its book-keeping
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointInfo {
    pub address: u16,
    pub watched: bool,
    pub enabled: bool,
    pub hit_count: u32,
}

/// Aggregate status reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub running: bool,
    pub frame_counter: u64,
    pub mounted_disks: Vec<(u8, String)>,
    pub breakpoint_count: usize,
    pub control_clients: usize,
    pub video_clients: usize,
    pub audio_clients: usize,
}

/// Exactly one of these is produced per accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRep {
    Pong,
    Ack,
    Status(StatusInfo),
    Memory(Vec<u8>),
    Registers(RegisterFile),
    Breakpoints(Vec<BreakpointInfo>),
    Drives(Vec<(u8, String)>),
    Disassembly(Vec<String>),
    Saved,
    Loaded,
    Screenshot(Option<String>),
    Error { kind: ErrorKind, message: String },
}

/// Why the orchestrator halted, for the `Halted` wire event / CLI `stopped`
/// event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    Breakpoint { address: u16 },
    Trap { address: u16 },
    UserRequested,
    CpuFault,
}

/// Asynchronous, unsolicited events delivered out-of-band from replies.
/// Breakpoint hits are never silently lost: when a client's event buffer
/// overflows, excess hits are coalesced and reported via a `lost_count`
/// indicator rather than dropped without a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    Breakpoint {
        address: u16,
        registers: RegisterFile,
    },
    Stopped {
        address: u16,
    },
    Error {
        message: String,
    },
}
