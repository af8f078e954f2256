use aesp_wire::payloads::{
    ConsoleKeysPayload, JoystickPayload, KeyEventPayload, RegisterFile, SetRegistersPayload,
};

/// Which broadcast channel a subscribe/unsubscribe request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubChannel {
    Video,
    Audio,
}

/// A breakpoint-table operation, shared by the control channel's
/// `Breakpoint` message and the CLI's `breakpoint` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointOp {
    Set { address: u16 },
    Clear { address: u16 },
    ClearAll,
    List,
}

/// One decoded control-channel (or CLI-equivalent) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCmd {
    Ping,
    Pause,
    Resume,
    Reset { cold: bool },
    Status,
    Subscribe { channel: SubChannel },
    Unsubscribe { channel: SubChannel },
    KeyDown(KeyEventPayload),
    KeyUp(KeyEventPayload),
    Joystick(JoystickPayload),
    ConsoleKeys(ConsoleKeysPayload),
    ReadMemory { address: u16, count: u16 },
    WriteMemory { address: u16, bytes: Vec<u8> },
    GetRegisters,
    SetRegisters(SetRegistersPayload),
    Step { frames: u32 },
    StepOver,
    Until { address: u16 },
    Breakpoint(BreakpointOp),
    Disassemble { address: Option<u16>, lines: u16 },
    Assemble { address: u16, text: String },
    Fill { start: u16, end: u16, byte: u8 },
    MountDisk { drive: u8, path: String },
    UnmountDisk { drive: u8 },
    ListDrives,
    SaveState { path: String },
    LoadState { path: String },
    Screenshot { path: Option<String> },
    InjectBasic { text: String },
    InjectKeys { text: String },
    Quit,
    Shutdown,
}

/// The register file the control handler hands back for `GetRegisters`
/// and `Status`.
pub type Registers = RegisterFile;
