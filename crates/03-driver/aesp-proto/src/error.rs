/// The numeric kind carried by a wire `Error` frame and the text after
/// `ERR:` on the CLI endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    Protocol = 0,
    Parse = 1,
    State = 2,
    Debugger = 3,
    Emulator = 4,
    Io = 5,
}

/// CLI grammar / argument errors.
///
/// Carries an optional `hint` alongside the message so a malformed command
/// can suggest the correct usage instead of just rejecting it.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }
}
