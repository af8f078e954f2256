//! The shared ABI between the transport layer and the emulator/debugger
//! services: command and reply enums used by both the binary control
//! channel and the CLI endpoint, plus the CLI grammar parser. No transport
//! or emulation code lives here.

mod cli;
mod cmd;
mod error;
mod rep;

pub use cli::{format_addr, format_byte, parse_line};
pub use cmd::{BreakpointOp, ControlCmd, Registers, SubChannel};
pub use error::{ErrorKind, ParseError};
pub use rep::{BreakpointInfo, ControlRep, DebugEvent, HaltReason, StatusInfo};
