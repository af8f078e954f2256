/// Why a state-changing request was refused given the emulator's current
/// run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("the emulator must be paused first")]
    MustPause,
    #[error("the emulator is already running")]
    AlreadyRunning,
    #[error("no server is attached")]
    NoServer,
}

/// Failures owned by the emulator core itself, as opposed to the
/// debugger's breakpoint bookkeeping ([`debugger_core::DebuggerError`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmulatorError {
    #[error("the emulator has not been initialized with a ROM")]
    NotInitialized,
    #[error("the CPU core faulted: {0}")]
    CpuFault(String),
    #[error("no ROM image is loaded")]
    RomMissing,
}
