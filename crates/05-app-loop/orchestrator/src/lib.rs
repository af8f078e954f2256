//! Ties the channel dispatchers, control handler, frame loop, and CLI
//! endpoint together into the running server. No socket acceptance lives
//! here — that belongs to the `aesp-server` binary, which owns
//! `TcpListener`s and the CLI's `UnixListener` and wires them to the
//! types this crate exports.

mod cli;
mod control;
mod dispatcher;
mod frame_loop;
mod run_signal;
mod video_audio;
mod wire;

pub use cli::{handle_connection as handle_cli_connection, MAX_REQUEST_BYTES, PING_TIMEOUT, REQUEST_TIMEOUT};
pub use control::{ControlHandler, Notification};
pub use dispatcher::ChannelDispatcher;
pub use frame_loop::FrameLoop;
pub use run_signal::RunSignal;
pub use video_audio::run as run_video_audio_connection;
pub use wire::{error_payload, frame_to_cmd, notification_to_frame, registers_payload, rep_to_frame};
