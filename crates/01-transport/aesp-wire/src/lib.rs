//! The AESP binary frame codec: `magic | version | type | length | payload`.
//!
//! This crate owns frame encoding and payload layout and nothing else — no
//! socket I/O, no client bookkeeping. [`net_io`](../net_io/index.html)
//! builds the connection-level reader/writer loops on top of [`decode`] and
//! [`encode`].

mod error;
mod frame;
mod message_type;
pub mod payloads;

pub use error::FrameError;
pub use frame::{decode, encode, Frame, HEADER_LEN, MAGIC, MAX_PAYLOAD, VERSION};
pub use message_type::MessageType;
