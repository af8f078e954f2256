/// I/O-layer failures surfaced by the framing tasks.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("connection reset by peer")]
    ConnectionReset,
    #[error("operation timed out")]
    Timeout,
    #[error("no socket found at the expected path")]
    SocketNotFound,
}
