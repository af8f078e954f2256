/// The stable tag of every AESP message.
///
/// Values are assigned once and never renumbered; gaps between the
/// control/input/video/audio/memory/register/debug groups are deliberate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Ping = 0x01,
    Pause = 0x02,
    Resume = 0x03,
    Reset = 0x04,
    Status = 0x05,
    StatusReply = 0x06,
    Ack = 0x07,
    Error = 0x08,

    KeyDown = 0x10,
    KeyUp = 0x11,
    Joystick = 0x12,
    ConsoleKeys = 0x13,

    VideoSubscribe = 0x20,
    VideoUnsubscribe = 0x21,
    FrameRaw = 0x22,
    FrameDelta = 0x23,

    AudioSubscribe = 0x30,
    AudioUnsubscribe = 0x31,
    AudioPcm = 0x32,
    AudioSync = 0x33,

    ReadMemory = 0x40,
    MemoryReply = 0x41,
    WriteMemory = 0x42,

    GetRegisters = 0x50,
    RegistersReply = 0x51,
    SetRegisters = 0x52,

    Breakpoint = 0x60,
    Halted = 0x61,
}

impl MessageType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = crate::FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use MessageType::*;
        Ok(match value {
            0x01 => Ping,
            0x02 => Pause,
            0x03 => Resume,
            0x04 => Reset,
            0x05 => Status,
            0x06 => StatusReply,
            0x07 => Ack,
            0x08 => Error,
            0x10 => KeyDown,
            0x11 => KeyUp,
            0x12 => Joystick,
            0x13 => ConsoleKeys,
            0x20 => VideoSubscribe,
            0x21 => VideoUnsubscribe,
            0x22 => FrameRaw,
            0x23 => FrameDelta,
            0x30 => AudioSubscribe,
            0x31 => AudioUnsubscribe,
            0x32 => AudioPcm,
            0x33 => AudioSync,
            0x40 => ReadMemory,
            0x41 => MemoryReply,
            0x42 => WriteMemory,
            0x50 => GetRegisters,
            0x51 => RegistersReply,
            0x52 => SetRegisters,
            0x60 => Breakpoint,
            0x61 => Halted,
            other => return Err(crate::FrameError::UnknownType(other)),
        })
    }
}
