/// Failure modes produced while decoding an AESP frame.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported protocol version {0}")]
    BadVersion(u8),
    #[error("payload length {0} exceeds the {1} byte limit")]
    LengthExceeded(u32, usize),
    #[error("connection closed before a full frame was read")]
    Truncated,
    #[error("unknown message type byte {0:#04x}")]
    UnknownType(u8),
}
