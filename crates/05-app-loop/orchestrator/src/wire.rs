//! Translates between [`aesp_wire::Frame`]s on the binary control channel
//! and [`ControlCmd`]/[`ControlRep`]. Only the operations that have a
//! message type in the wire table are reachable here — breakpoint
//! management, stepping variants other than `Step`, disassembly,
//! assembling, disk/state/screenshot/inject operations have no wire
//! message type and are reachable only through the CLI endpoint, which
//! calls the control handler directly with a parsed [`ControlCmd`]
//! instead of going through this module.

use aesp_proto::{ControlCmd, ControlRep, DebugEvent, ErrorKind, HaltReason};
use aesp_wire::payloads::{
    BreakpointEventPayload, ConsoleKeysPayload, HaltedPayload, JoystickPayload, KeyEventPayload,
    ReadMemoryPayload, RegisterFile, SetRegistersPayload, WriteMemoryPayload,
};
use aesp_wire::{Frame, MessageType};

use crate::control::Notification;

/// Decodes an inbound control-channel frame into a command, or `None` if
/// the message type carries no control-channel meaning (e.g. a reply type
/// sent by mistake, or a payload too short for its type).
pub fn frame_to_cmd(frame: &Frame) -> Option<ControlCmd> {
    let payload = frame.payload.as_ref();
    match frame.kind {
        MessageType::Ping => Some(ControlCmd::Ping),
        MessageType::Pause => Some(ControlCmd::Pause),
        MessageType::Resume => Some(ControlCmd::Resume),
        MessageType::Reset => {
            let cold = payload.first().copied().unwrap_or(0) != 0;
            Some(ControlCmd::Reset { cold })
        }
        MessageType::Status => Some(ControlCmd::Status),
        MessageType::KeyDown => KeyEventPayload::decode(payload).map(ControlCmd::KeyDown),
        MessageType::KeyUp => KeyEventPayload::decode(payload).map(ControlCmd::KeyUp),
        MessageType::Joystick => JoystickPayload::decode(payload).map(ControlCmd::Joystick),
        MessageType::ConsoleKeys => ConsoleKeysPayload::decode(payload).map(ControlCmd::ConsoleKeys),
        MessageType::ReadMemory => ReadMemoryPayload::decode(payload).map(|p| ControlCmd::ReadMemory {
            address: p.address,
            count: p.count,
        }),
        MessageType::WriteMemory => WriteMemoryPayload::decode(payload).map(|p| ControlCmd::WriteMemory {
            address: p.address,
            bytes: p.bytes,
        }),
        MessageType::GetRegisters => Some(ControlCmd::GetRegisters),
        MessageType::SetRegisters => SetRegistersPayload::decode(payload).map(ControlCmd::SetRegisters),
        _ => None,
    }
}

/// Encodes a reply for the binary control channel. Reply variants that
/// only the CLI endpoint can produce (disassembly text, breakpoint
/// listings, drive listings, ...) are encoded as a generic `Error` frame
/// describing the mismatch, since no client reachable only through
/// `frame_to_cmd` can trigger them.
pub fn rep_to_frame(rep: &ControlRep) -> Frame {
    match rep {
        ControlRep::Pong => Frame::new(MessageType::Ack, Default::default()),
        ControlRep::Ack => Frame::new(MessageType::Ack, Default::default()),
        ControlRep::Status(status) => {
            Frame::new(MessageType::StatusReply, status_payload(status).into())
        }
        ControlRep::Memory(bytes) => Frame::new(MessageType::MemoryReply, bytes.clone().into()),
        ControlRep::Registers(regs) => {
            Frame::new(MessageType::RegistersReply, regs.encode().to_vec().into())
        }
        ControlRep::Error { kind, message } => {
            Frame::new(MessageType::Error, error_payload(*kind, message).into())
        }
        ControlRep::Breakpoints(_)
        | ControlRep::Drives(_)
        | ControlRep::Disassembly(_)
        | ControlRep::Saved
        | ControlRep::Loaded
        | ControlRep::Screenshot(_) => Frame::new(
            MessageType::Error,
            error_payload(
                ErrorKind::Protocol,
                "this operation is available only through the CLI endpoint",
            )
            .into(),
        ),
    }
}

/// Encodes an async [`Notification`] as the wire frame binary control
/// clients receive on the control channel, mirroring the event the CLI
/// endpoint renders as `EVENT:`.
pub fn notification_to_frame(notification: &Notification) -> Frame {
    match notification {
        Notification::Debug(DebugEvent::Breakpoint { address, registers }) => Frame::new(
            MessageType::Breakpoint,
            BreakpointEventPayload {
                address: *address,
                registers: *registers,
            }
            .encode()
            .to_vec(),
        ),
        Notification::Debug(DebugEvent::Stopped { address }) => Frame::new(
            MessageType::Halted,
            HaltedPayload {
                reason: HaltedPayload::REASON_STOPPED,
                address: *address,
            }
            .encode()
            .to_vec(),
        ),
        Notification::Debug(DebugEvent::Error { message }) => {
            Frame::new(MessageType::Error, error_payload(ErrorKind::Emulator, message))
        }
        Notification::Halted(HaltReason::Breakpoint { address }) => Frame::new(
            MessageType::Breakpoint,
            BreakpointEventPayload {
                address: *address,
                registers: RegisterFile::default(),
            }
            .encode()
            .to_vec(),
        ),
        Notification::Halted(HaltReason::Trap { address }) => Frame::new(
            MessageType::Halted,
            HaltedPayload {
                reason: HaltedPayload::REASON_STOPPED,
                address: *address,
            }
            .encode()
            .to_vec(),
        ),
        Notification::Halted(HaltReason::UserRequested) => Frame::new(
            MessageType::Halted,
            HaltedPayload {
                reason: HaltedPayload::REASON_USER,
                address: 0,
            }
            .encode()
            .to_vec(),
        ),
        Notification::Halted(HaltReason::CpuFault) => Frame::new(
            MessageType::Halted,
            HaltedPayload {
                reason: HaltedPayload::REASON_CPU_FAULT,
                address: 0,
            }
            .encode()
            .to_vec(),
        ),
    }
}

fn status_payload(status: &aesp_proto::StatusInfo) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    out.push(u8::from(status.running));
    out.extend_from_slice(&status.frame_counter.to_le_bytes());
    out
}

pub fn error_payload(kind: ErrorKind, message: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + message.len());
    out.push(kind as u8);
    out.extend_from_slice(message.as_bytes());
    out
}

pub fn registers_payload(regs: RegisterFile) -> Vec<u8> {
    regs.encode().to_vec()
}
