//! Renderable view-model of emulator and debugger state, shared by the
//! CLI endpoint and the control channel's `Status` reply so the two
//! surfaces can never disagree about formatting.

use aesp_proto::{format_addr, format_byte, BreakpointInfo, StatusInfo};
use aesp_wire::payloads::RegisterFile;
use serde::Serialize;

/// A breakpoint as rendered for a client, independent of wire encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakpointVM {
    pub address: u16,
    pub watched: bool,
    pub enabled: bool,
    pub hit_count: u32,
}

impl From<BreakpointInfo> for BreakpointVM {
    fn from(info: BreakpointInfo) -> Self {
        Self {
            address: info.address,
            watched: info.watched,
            enabled: info.enabled,
            hit_count: info.hit_count,
        }
    }
}

/// A mounted disk as rendered for a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskVM {
    pub drive: u8,
    pub path: String,
}

/// The full snapshot a client can inspect: register file, run state,
/// breakpoints, and mounted disks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmulatorVM {
    pub registers: RegisterFile,
    pub running: bool,
    pub frame_counter: u64,
    pub breakpoints: Vec<BreakpointVM>,
    pub disks: Vec<DiskVM>,
    pub control_clients: usize,
    pub video_clients: usize,
    pub audio_clients: usize,
}

impl EmulatorVM {
    pub fn from_status(status: &StatusInfo, registers: RegisterFile, breakpoints: Vec<BreakpointInfo>) -> Self {
        Self {
            registers,
            running: status.running,
            frame_counter: status.frame_counter,
            breakpoints: breakpoints.into_iter().map(BreakpointVM::from).collect(),
            disks: status
                .mounted_disks
                .iter()
                .map(|(drive, path)| DiskVM {
                    drive: *drive,
                    path: path.clone(),
                })
                .collect(),
            control_clients: status.control_clients,
            video_clients: status.video_clients,
            audio_clients: status.audio_clients,
        }
    }
}

/// Renders the `status` verb's reply: one line per field, the form both
/// the CLI endpoint and a human at a terminal expect.
pub fn render_status(vm: &EmulatorVM) -> String {
    let lines = [
        format!("running={}", vm.running),
        format!("frame={}", vm.frame_counter),
        format!("pc={}", format_addr(vm.registers.pc)),
        format!("breakpoints={}", vm.breakpoints.len()),
        format!("disks={}", vm.disks.len()),
        format!(
            "clients=control:{} video:{} audio:{}",
            vm.control_clients, vm.video_clients, vm.audio_clients
        ),
    ];
    lines.join("\x1E")
}

/// Renders the six-register file in the `NAME=$NN` form the CLI grammar's
/// `registers` verb both accepts and emits.
pub fn render_registers(registers: &RegisterFile) -> String {
    format!(
        "A={} X={} Y={} S={} P={} PC={}",
        format_byte(registers.a),
        format_byte(registers.x),
        format_byte(registers.y),
        format_byte(registers.s),
        format_byte(registers.p),
        format_addr(registers.pc),
    )
}

/// Renders a disassembly listing as `$ADDR  MNEMONIC` lines joined by the
/// record separator used for every multi-line CLI payload.
pub fn render_disassembly(lines: &[(u16, String)]) -> String {
    lines
        .iter()
        .map(|(addr, text)| format!("{}  {}", format_addr(*addr), text))
        .collect::<Vec<_>>()
        .join("\x1E")
}

/// Renders a memory dump starting at `base` as space-separated hex bytes,
/// sixteen per line, each line labeled with its starting address.
pub fn render_memory(base: u16, bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let addr = base.wrapping_add((row * 16) as u16);
            let hex = chunk
                .iter()
                .map(|b| format_byte(*b))
                .collect::<Vec<_>>()
                .join(" ");
            format!("{}  {hex}", format_addr(addr))
        })
        .collect::<Vec<_>>()
        .join("\x1E")
}

/// Renders the breakpoint table for the `breakpoint list` verb.
pub fn render_breakpoints(breakpoints: &[BreakpointVM]) -> String {
    if breakpoints.is_empty() {
        return "no breakpoints set".to_string();
    }
    breakpoints
        .iter()
        .map(|bp| {
            format!(
                "{} {} {} hits={}",
                format_addr(bp.address),
                if bp.watched { "watched" } else { "substituted" },
                if bp.enabled { "enabled" } else { "disabled" },
                bp.hit_count,
            )
        })
        .collect::<Vec<_>>()
        .join("\x1E")
}
