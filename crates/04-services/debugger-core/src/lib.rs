mod breakpoint;
mod core;
mod error;
mod event;

pub use breakpoint::{Breakpoint, BreakpointKind, BreakpointTable, TemporaryBreakpoint};
pub use core::{DebugCore, DebugHalt};
pub use error::DebuggerError;
pub use event::{EventBuffer, EventSink};
