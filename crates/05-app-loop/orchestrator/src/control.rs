//! Maps a decoded [`ControlCmd`] onto the emulator façade and debugger
//! core, producing exactly one [`ControlRep`] per request. Shared,
//! unmodified, between the binary control channel and the CLI endpoint so
//! the two surfaces can never drift apart (spec.md's control-handler and
//! CLI-endpoint sections describe the same operation set).

use std::sync::Arc;

use aesp_proto::{BreakpointOp, ControlCmd, ControlRep, DebugEvent, ErrorKind, HaltReason, StatusInfo};
use debugger_core::{DebuggerError, EventSink};
use emu_facade::{EmuFacade, EmulatorError, FrameOutcome, StateError};
use net_io::ClientId;
use parking_lot::Mutex;

use crate::dispatcher::ChannelDispatcher;
use crate::run_signal::RunSignal;

/// An asynchronous notification produced as a side effect of handling a
/// request, to be broadcast on the control channel and mirrored to the
/// CLI endpoint as an `EVENT:` line, distinct from the request's own
/// reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Debug(DebugEvent),
    Halted(HaltReason),
}

pub struct ControlHandler {
    facade: Arc<EmuFacade>,
    control: Arc<ChannelDispatcher>,
    video: Arc<ChannelDispatcher>,
    audio: Arc<ChannelDispatcher>,
    run_signal: RunSignal,
    /// One pending-notification buffer per CLI listener, so a connection
    /// whose reader falls behind a burst of events coalesces them with a
    /// `lost_count` instead of silently missing them (spec.md's "hit
    /// events are never lost" guarantee).
    cli_listeners: Mutex<EventSink<ClientId, Notification>>,
}

impl ControlHandler {
    pub fn new(
        facade: Arc<EmuFacade>,
        control: Arc<ChannelDispatcher>,
        video: Arc<ChannelDispatcher>,
        audio: Arc<ChannelDispatcher>,
        run_signal: RunSignal,
    ) -> Self {
        Self {
            facade,
            control,
            video,
            audio,
            run_signal,
            cli_listeners: Mutex::new(EventSink::new()),
        }
    }

    /// Registers a CLI connection to start receiving coalesced
    /// notifications. Call once when the connection is accepted.
    pub fn register_cli_listener(&self, client: ClientId) {
        self.cli_listeners.lock().register(client);
    }

    /// Removes a CLI connection's buffer. Call once when the connection
    /// closes.
    pub fn deregister_cli_listener(&self, client: ClientId) {
        self.cli_listeners.lock().deregister(&client);
    }

    /// Delivers `notification` to every registered CLI listener's own
    /// buffer, coalescing with whatever that listener hasn't drained yet.
    pub fn publish_to_cli_listeners(&self, notification: &Notification) {
        self.cli_listeners.lock().publish(notification);
    }

    /// Drains one CLI listener's pending notification, if any, along with
    /// how many prior notifications it was coalesced with.
    pub fn drain_cli_listener(&self, client: ClientId) -> Option<(Notification, u32)> {
        self.cli_listeners.lock().drain(&client)
    }

    /// Handles one command, returning its reply and, when the operation
    /// produced a debugger event worth telling every connected client
    /// about, that event too.
    pub fn handle(&self, cmd: ControlCmd) -> (ControlRep, Option<Notification>) {
        match cmd {
            ControlCmd::Ping => (ControlRep::Pong, None),
            ControlCmd::Pause => {
                self.facade.pause();
                (ControlRep::Ack, None)
            }
            ControlCmd::Resume => match self.facade.resume() {
                Ok(()) => {
                    self.run_signal.notify();
                    (ControlRep::Ack, None)
                }
                Err(err) => (state_error(err), None),
            },
            ControlCmd::Reset { cold } => {
                self.facade.reset(cold);
                (ControlRep::Ack, None)
            }
            ControlCmd::Status => (ControlRep::Status(self.status()), None),
            ControlCmd::Subscribe { .. } | ControlCmd::Unsubscribe { .. } => (
                ControlRep::Error {
                    kind: ErrorKind::Protocol,
                    message: "subscription is set on the video/audio connection itself".into(),
                },
                None,
            ),
            ControlCmd::KeyDown(event) => {
                self.facade.stage_key(event, true);
                (ControlRep::Ack, None)
            }
            ControlCmd::KeyUp(event) => {
                self.facade.stage_key(event, false);
                (ControlRep::Ack, None)
            }
            ControlCmd::Joystick(state) => {
                self.facade.stage_joystick(state);
                (ControlRep::Ack, None)
            }
            ControlCmd::ConsoleKeys(state) => {
                self.facade.stage_console_keys(state);
                (ControlRep::Ack, None)
            }
            ControlCmd::ReadMemory { address, count } => {
                (ControlRep::Memory(self.facade.read_block(address, count)), None)
            }
            ControlCmd::WriteMemory { address, bytes } => {
                self.facade.write_block(address, &bytes);
                (ControlRep::Ack, None)
            }
            ControlCmd::GetRegisters => (ControlRep::Registers(self.facade.get_registers()), None),
            ControlCmd::SetRegisters(payload) => {
                match self.facade.set_registers(payload.mask, payload.registers) {
                    Ok(()) => (ControlRep::Ack, None),
                    Err(err) => (state_error(err), None),
                }
            }
            ControlCmd::Step { frames } => self.run_steps(frames.max(1)),
            ControlCmd::StepOver => self.from_outcome(self.facade.step_over()),
            ControlCmd::Until { address } => self.from_outcome(self.facade.run_until(address)),
            ControlCmd::Breakpoint(op) => self.breakpoint(op),
            ControlCmd::Disassemble { address, lines } => {
                let lines = self.facade.disassemble(address, lines);
                let rendered = lines
                    .into_iter()
                    .map(|(addr, text)| format!("{} {}", aesp_proto::format_addr(addr), text))
                    .collect();
                (ControlRep::Disassembly(rendered), None)
            }
            ControlCmd::Assemble { address, text } => self.assemble(address, &text),
            ControlCmd::Fill { start, end, byte } => {
                self.facade.fill(start, end, byte);
                (ControlRep::Ack, None)
            }
            ControlCmd::MountDisk { drive, path } => {
                self.facade.mount_disk(drive, path);
                (ControlRep::Ack, None)
            }
            ControlCmd::UnmountDisk { drive } => {
                self.facade.unmount_disk(drive);
                (ControlRep::Ack, None)
            }
            ControlCmd::ListDrives => (ControlRep::Drives(self.facade.list_disks()), None),
            ControlCmd::SaveState { path } => match std::fs::write(&path, self.facade.save_state()) {
                Ok(()) => (ControlRep::Saved, None),
                Err(err) => (io_error(err.to_string()), None),
            },
            ControlCmd::LoadState { path } => match std::fs::read(&path) {
                Ok(blob) => match self.facade.restore_state(&blob) {
                    Ok(()) => (ControlRep::Loaded, None),
                    Err(err) => (emulator_error(err), None),
                },
                Err(err) => (io_error(err.to_string()), None),
            },
            ControlCmd::Screenshot { path } => self.screenshot(path),
            ControlCmd::InjectBasic { text } => (
                ControlRep::Error {
                    kind: ErrorKind::Parse,
                    message: format!("BASIC tokenization is out of scope; {} bytes ignored", text.len()),
                },
                None,
            ),
            ControlCmd::InjectKeys { text } => {
                for ch in text.bytes() {
                    self.facade.stage_key(
                        aesp_wire::payloads::KeyEventPayload {
                            key_char: ch,
                            key_code: ch,
                            shift: false,
                            control: false,
                        },
                        true,
                    );
                }
                (ControlRep::Ack, None)
            }
            ControlCmd::Quit => (ControlRep::Ack, None),
            ControlCmd::Shutdown => (ControlRep::Ack, None),
        }
    }

    fn status(&self) -> StatusInfo {
        StatusInfo {
            running: self.facade.is_running(),
            frame_counter: self.facade.frame_counter(),
            mounted_disks: self.facade.list_disks(),
            breakpoint_count: self.facade.breakpoint_count(),
            control_clients: self.control.client_count(),
            video_clients: self.video.client_count(),
            audio_clients: self.audio.client_count(),
        }
    }

    /// Builds the full view-model the CLI endpoint renders for the
    /// `status` verb, pulling in the registers and breakpoint detail the
    /// wire `Status` reply leaves out.
    pub fn status_vm(&self) -> inspector_vm::EmulatorVM {
        let status = self.status();
        let registers = self.facade.get_registers();
        let breakpoints = self.facade.list_breakpoints().into_iter().collect();
        inspector_vm::EmulatorVM::from_status(&status, registers, breakpoints)
    }

    fn run_steps(&self, frames: u32) -> (ControlRep, Option<Notification>) {
        for _ in 0..frames {
            match self.facade.advance_one_frame() {
                Ok(FrameOutcome::Ok) => continue,
                Ok(other) => return (ControlRep::Ack, Some(notification_for(other))),
                Err(err) => return (emulator_error(err), None),
            }
        }
        (
            ControlRep::Ack,
            Some(Notification::Halted(HaltReason::UserRequested)),
        )
    }

    fn from_outcome(&self, outcome: FrameOutcome) -> (ControlRep, Option<Notification>) {
        match &outcome {
            FrameOutcome::Ok => (
                ControlRep::Ack,
                Some(Notification::Halted(HaltReason::UserRequested)),
            ),
            _ => (ControlRep::Ack, Some(notification_for(outcome))),
        }
    }

    fn breakpoint(&self, op: BreakpointOp) -> (ControlRep, Option<Notification>) {
        let result = match op {
            BreakpointOp::Set { address } => self.facade.set_breakpoint(address),
            BreakpointOp::Clear { address } => self.facade.clear_breakpoint(address),
            BreakpointOp::ClearAll => self.facade.clear_all_breakpoints(),
            BreakpointOp::List => {
                return (
                    ControlRep::Breakpoints(self.facade.list_breakpoints().into_iter().collect()),
                    None,
                )
            }
        };
        match result {
            Ok(()) => (ControlRep::Ack, None),
            Err(err) => (debugger_error(err), None),
        }
    }

    /// No 6502 assembler exists in the corpus to ground one on, so
    /// `assemble` accepts the same hex-byte grammar as `write` and pokes
    /// the bytes directly rather than parsing mnemonics.
    fn assemble(&self, address: u16, text: &str) -> (ControlRep, Option<Notification>) {
        let mut bytes = Vec::new();
        for token in text.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            match u8::from_str_radix(token.trim_start_matches('$'), 16) {
                Ok(byte) => bytes.push(byte),
                Err(_) => {
                    return (
                        ControlRep::Error {
                            kind: ErrorKind::Parse,
                            message: format!("'{token}' is not a hex byte"),
                        },
                        None,
                    )
                }
            }
        }
        self.facade.write_block(address, &bytes);
        (ControlRep::Ack, None)
    }

    /// No video chip is implemented (out of scope); the "screenshot" is
    /// the raw placeholder frame buffer the façade produces each frame.
    fn screenshot(&self, path: Option<String>) -> (ControlRep, Option<Notification>) {
        let (w, h) = self.facade.frame_dimensions();
        let mut buf = vec![0u8; usize::from(w) * usize::from(h)];
        self.facade.take_frame(&mut buf);
        if let Some(path) = &path {
            if let Err(err) = std::fs::write(path, &buf) {
                return (io_error(err.to_string()), None);
            }
        }
        (ControlRep::Screenshot(path), None)
    }
}

fn notification_for(outcome: FrameOutcome) -> Notification {
    match outcome {
        FrameOutcome::Ok => Notification::Halted(HaltReason::UserRequested),
        FrameOutcome::Breakpoint { address, registers } => {
            Notification::Debug(DebugEvent::Breakpoint { address, registers })
        }
        FrameOutcome::Stopped { address } => Notification::Halted(HaltReason::Trap { address }),
        FrameOutcome::CpuFault(message) => Notification::Debug(DebugEvent::Error { message }),
    }
}

fn state_error(err: StateError) -> ControlRep {
    ControlRep::Error {
        kind: ErrorKind::State,
        message: err.to_string(),
    }
}

fn debugger_error(err: DebuggerError) -> ControlRep {
    ControlRep::Error {
        kind: ErrorKind::Debugger,
        message: err.to_string(),
    }
}

fn emulator_error(err: EmulatorError) -> ControlRep {
    ControlRep::Error {
        kind: ErrorKind::Emulator,
        message: err.to_string(),
    }
}

fn io_error(message: String) -> ControlRep {
    ControlRep::Error {
        kind: ErrorKind::Io,
        message,
    }
}
