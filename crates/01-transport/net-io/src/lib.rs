//! Per-connection framing: reader/writer tasks and the bounded outbound
//! queue with drop-oldest back-pressure.
//!
//! This crate knows nothing about channels, subscriptions, or the
//! emulator; [`orchestrator`](../orchestrator/index.html) owns that.

mod client_id;
mod error;
mod outbound_queue;
mod reader;
mod writer;

pub use client_id::ClientId;
pub use error::IoError;
pub use outbound_queue::{OutboundQueue, QueuePolicy};
pub use reader::reader_loop;
pub use writer::writer_loop;
