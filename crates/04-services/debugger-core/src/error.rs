/// Breakpoint-table operation failures. All of these fail cleanly: no
/// partial state change is ever observed by a caller that receives one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DebuggerError {
    #[error("a breakpoint already exists at ${address:04X}")]
    AlreadyExists { address: u16 },
    #[error("no breakpoint at ${address:04X}")]
    NotFound { address: u16 },
    #[error("cannot install a substituted breakpoint in ROM at ${address:04X}")]
    CannotModifyRom { address: u16 },
    #[error("address is outside the 16-bit address space")]
    InvalidAddress,
    #[error("the emulator must be paused first")]
    MustPause,
}
