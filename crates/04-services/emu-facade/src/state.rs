use std::collections::HashMap;

use aesp_wire::payloads::{ConsoleKeysPayload, JoystickPayload, KeyEventPayload, RegisterFile};
use debugger_core::{DebugCore, DebugHalt};
use mos6502::{Bus, Cpu, MemoryMap};
use parking_lot::Mutex;

use crate::error::{EmulatorError, StateError};
use crate::pending::PendingInput;
use crate::snapshot;

/// Outcome of advancing the emulator by one frame or one instruction,
/// surfaced to the orchestrator so it can decide what to broadcast and
/// what debug event, if any, to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Ok,
    Breakpoint { address: u16, registers: RegisterFile },
    Stopped { address: u16 },
    CpuFault(String),
}

impl FrameOutcome {
    fn from_halt(halt: DebugHalt) -> Self {
        match halt {
            DebugHalt::Normal => FrameOutcome::Ok,
            DebugHalt::Breakpoint(aesp_proto::DebugEvent::Breakpoint { address, registers }) => {
                FrameOutcome::Breakpoint { address, registers }
            }
            DebugHalt::Breakpoint(_) => FrameOutcome::Ok,
            DebugHalt::Stopped { address } => FrameOutcome::Stopped { address },
            DebugHalt::CpuFault(message) => FrameOutcome::CpuFault(message),
        }
    }
}

struct EmuState {
    cpu: Cpu,
    bus: MemoryMap,
    debugger: DebugCore,
    rom_loaded: bool,
    running: bool,
    disks: HashMap<u8, String>,
    pending_input: PendingInput,
    applied_input: PendingInput,
}

impl EmuState {
    fn new(rom: Option<&[u8]>) -> Self {
        let mut bus = MemoryMap::with_defaults();
        let rom_loaded = if let Some(rom) = rom {
            bus.load_rom(rom);
            true
        } else {
            false
        };
        let mut cpu = Cpu::new();
        cpu.reset(&mut bus);
        Self {
            cpu,
            bus,
            debugger: DebugCore::new(),
            rom_loaded,
            running: false,
            disks: HashMap::new(),
            pending_input: PendingInput::new(),
            applied_input: PendingInput::new(),
        }
    }
}

/// Serializes every access to the opaque emulation core behind one mutex,
/// so it can be called from the control handler, the CLI handler, and the
/// frame-loop task without any of them racing the others.
pub struct EmuFacade {
    inner: Mutex<EmuState>,
}

impl EmuFacade {
    pub fn new(rom: Option<&[u8]>) -> Self {
        Self {
            inner: Mutex::new(EmuState::new(rom)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    pub fn pause(&self) {
        self.inner.lock().running = false;
    }

    pub fn resume(&self) -> Result<(), StateError> {
        let mut state = self.inner.lock();
        if state.running {
            return Err(StateError::AlreadyRunning);
        }
        state.running = true;
        Ok(())
    }

    /// Latches the next frame's input; has no effect until the next
    /// [`EmuFacade::advance_one_frame`] call applies it.
    pub fn apply_pending_input(&self, input: PendingInput) {
        self.inner.lock().pending_input = input;
    }

    pub fn applied_input(&self) -> PendingInput {
        self.inner.lock().applied_input.clone()
    }

    /// Stages a single key event, merging into whatever is already
    /// pending rather than replacing it.
    pub fn stage_key(&self, event: KeyEventPayload, down: bool) {
        self.inner.lock().pending_input.push_key(event, down);
    }

    pub fn stage_joystick(&self, state: JoystickPayload) {
        self.inner.lock().pending_input.set_joystick(state);
    }

    pub fn stage_console_keys(&self, state: ConsoleKeysPayload) {
        self.inner.lock().pending_input.set_console_keys(state);
    }

    /// Copies out the most recently rendered frame buffer, produced by
    /// the last completed [`EmuFacade::advance_one_frame`].
    pub fn take_frame(&self, out: &mut [u8]) {
        self.inner.lock().cpu.take_frame(out);
    }

    pub fn take_audio(&self, out: &mut [i16]) {
        self.inner.lock().cpu.take_audio(out);
    }

    pub fn frame_dimensions(&self) -> (u16, u16) {
        (Cpu::FRAME_WIDTH, Cpu::FRAME_HEIGHT)
    }

    /// Runs instructions until a frame's cycle budget is spent or the
    /// debugger halts execution early, honoring watched breakpoints on
    /// every instruction rather than only at frame boundaries.
    pub fn advance_one_frame(&self) -> Result<FrameOutcome, EmulatorError> {
        let mut state = self.inner.lock();
        if !state.rom_loaded {
            return Err(EmulatorError::RomMissing);
        }
        state.applied_input = std::mem::take(&mut state.pending_input);

        let budget = mos6502::CYCLES_PER_FRAME;
        let start_cycles = state.cpu.cycles;
        loop {
            let EmuState { cpu, bus, debugger, .. } = &mut *state;
            let halt = debugger.step_one(cpu, bus);
            if !matches!(halt, DebugHalt::Normal) {
                return Ok(FrameOutcome::from_halt(halt));
            }
            if state.cpu.cycles.saturating_sub(start_cycles) >= u64::from(budget) {
                break;
            }
        }
        state.cpu.finish_frame(&mut state.bus);
        Ok(FrameOutcome::Ok)
    }

    /// Advances exactly one instruction, returning the cycles it consumed.
    pub fn step_one_instruction(&self) -> Result<(u32, FrameOutcome), EmulatorError> {
        let mut state = self.inner.lock();
        if !state.rom_loaded {
            return Err(EmulatorError::RomMissing);
        }
        let before = state.cpu.cycles;
        let EmuState { cpu, bus, debugger, .. } = &mut *state;
        let halt = debugger.step_one(cpu, bus);
        let cycles = (state.cpu.cycles - before) as u32;
        Ok((cycles, FrameOutcome::from_halt(halt)))
    }

    pub fn step_over(&self) -> FrameOutcome {
        let mut state = self.inner.lock();
        let EmuState { cpu, bus, debugger, .. } = &mut *state;
        FrameOutcome::from_halt(debugger.step_over(cpu, bus))
    }

    pub fn run_until(&self, address: u16) -> FrameOutcome {
        let mut state = self.inner.lock();
        let EmuState { cpu, bus, debugger, .. } = &mut *state;
        FrameOutcome::from_halt(debugger.run_until(cpu, bus, address))
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        let mut state = self.inner.lock();
        let EmuState { bus, debugger, .. } = &mut *state;
        debugger.read_through(bus, addr)
    }

    pub fn write_byte(&self, addr: u16, value: u8) {
        let mut state = self.inner.lock();
        let EmuState { bus, debugger, .. } = &mut *state;
        debugger.write_through(bus, addr, value);
    }

    pub fn read_block(&self, addr: u16, count: u16) -> Vec<u8> {
        let mut state = self.inner.lock();
        (0..count)
            .map(|i| {
                let EmuState { bus, debugger, .. } = &mut *state;
                debugger.read_through(bus, addr.wrapping_add(i))
            })
            .collect()
    }

    pub fn write_block(&self, addr: u16, bytes: &[u8]) {
        let mut state = self.inner.lock();
        for (i, byte) in bytes.iter().enumerate() {
            let EmuState { bus, debugger, .. } = &mut *state;
            debugger.write_through(bus, addr.wrapping_add(i as u16), *byte);
        }
    }

    pub fn get_registers(&self) -> RegisterFile {
        let state = self.inner.lock();
        to_wire(state.cpu.regs)
    }

    /// Applies the masked subset of `registers`; requires the emulator to
    /// be paused since changing PC/flags mid-frame would corrupt the
    /// stepping state the debugger core is tracking.
    pub fn set_registers(&self, mask: u8, registers: RegisterFile) -> Result<(), StateError> {
        use aesp_wire::payloads::RegisterMask;
        let mut state = self.inner.lock();
        if state.running {
            return Err(StateError::MustPause);
        }
        if mask & RegisterMask::A != 0 {
            state.cpu.regs.a = registers.a;
        }
        if mask & RegisterMask::X != 0 {
            state.cpu.regs.x = registers.x;
        }
        if mask & RegisterMask::Y != 0 {
            state.cpu.regs.y = registers.y;
        }
        if mask & RegisterMask::S != 0 {
            state.cpu.regs.s = registers.s;
        }
        if mask & RegisterMask::P != 0 {
            state.cpu.regs.p = registers.p;
        }
        if mask & RegisterMask::PC != 0 {
            state.cpu.regs.pc = registers.pc;
        }
        Ok(())
    }

    pub fn reset(&self, cold: bool) {
        let mut state = self.inner.lock();
        let EmuState { cpu, bus, debugger, .. } = &mut *state;
        cpu.reset(bus);
        debugger.reset(bus, cold);
    }

    pub fn mount_disk(&self, drive: u8, path: String) {
        self.inner.lock().disks.insert(drive, path);
    }

    pub fn unmount_disk(&self, drive: u8) -> bool {
        self.inner.lock().disks.remove(&drive).is_some()
    }

    pub fn list_disks(&self) -> Vec<(u8, String)> {
        let state = self.inner.lock();
        let mut disks: Vec<_> = state.disks.iter().map(|(d, p)| (*d, p.clone())).collect();
        disks.sort_by_key(|(drive, _)| *drive);
        disks
    }

    pub fn save_state(&self) -> Vec<u8> {
        let state = self.inner.lock();
        snapshot::encode(&snapshot::Snapshot {
            registers: to_wire(state.cpu.regs),
            frame_counter: state.cpu.frame_counter,
            disks: state.disks.iter().map(|(d, p)| (*d, p.clone())).collect(),
            memory: state.bus.all_bytes().to_vec(),
        })
    }

    pub fn restore_state(&self, blob: &[u8]) -> Result<(), EmulatorError> {
        let snap = snapshot::decode(blob).map_err(EmulatorError::CpuFault)?;
        let mut state = self.inner.lock();
        state.bus.load_all(&snap.memory);
        state.cpu.regs.a = snap.registers.a;
        state.cpu.regs.x = snap.registers.x;
        state.cpu.regs.y = snap.registers.y;
        state.cpu.regs.s = snap.registers.s;
        state.cpu.regs.p = snap.registers.p;
        state.cpu.regs.pc = snap.registers.pc;
        state.cpu.frame_counter = snap.frame_counter;
        state.disks = snap.disks.into_iter().collect();
        state.rom_loaded = true;
        Ok(())
    }

    pub fn frame_counter(&self) -> u64 {
        self.inner.lock().cpu.frame_counter
    }

    pub fn breakpoint_count(&self) -> usize {
        self.inner.lock().debugger.breakpoint_count()
    }

    /// Breakpoint table edits require the emulator to be paused, the same
    /// rule [`EmuFacade::set_registers`] applies: a breakpoint installed or
    /// cleared mid-frame would race the frame loop's own in-flight step.
    pub fn set_breakpoint(&self, addr: u16) -> Result<(), debugger_core::DebuggerError> {
        let mut state = self.inner.lock();
        if state.running {
            return Err(debugger_core::DebuggerError::MustPause);
        }
        let EmuState { bus, debugger, .. } = &mut *state;
        debugger.set(bus, addr)
    }

    pub fn clear_breakpoint(&self, addr: u16) -> Result<(), debugger_core::DebuggerError> {
        let mut state = self.inner.lock();
        if state.running {
            return Err(debugger_core::DebuggerError::MustPause);
        }
        let EmuState { bus, debugger, .. } = &mut *state;
        debugger.clear(bus, addr)
    }

    pub fn clear_all_breakpoints(&self) -> Result<(), debugger_core::DebuggerError> {
        let mut state = self.inner.lock();
        if state.running {
            return Err(debugger_core::DebuggerError::MustPause);
        }
        let EmuState { bus, debugger, .. } = &mut *state;
        debugger.clear_all(bus);
        Ok(())
    }

    pub fn enable_breakpoint(&self, addr: u16) -> Result<(), debugger_core::DebuggerError> {
        let mut state = self.inner.lock();
        if state.running {
            return Err(debugger_core::DebuggerError::MustPause);
        }
        let EmuState { bus, debugger, .. } = &mut *state;
        debugger.enable(bus, addr)
    }

    pub fn disable_breakpoint(&self, addr: u16) -> Result<(), debugger_core::DebuggerError> {
        let mut state = self.inner.lock();
        if state.running {
            return Err(debugger_core::DebuggerError::MustPause);
        }
        let EmuState { bus, debugger, .. } = &mut *state;
        debugger.disable(bus, addr)
    }

    pub fn list_breakpoints(&self) -> smallvec::SmallVec<[aesp_proto::BreakpointInfo; 8]> {
        self.inner.lock().debugger.list()
    }

    /// Disassembles `lines` instructions starting at `address` (defaulting
    /// to the current PC), reading through the debugger so a substituted
    /// trap byte shows the user's original instruction.
    pub fn disassemble(&self, address: Option<u16>, lines: u16) -> Vec<(u16, String)> {
        let mut state = self.inner.lock();
        let start = address.unwrap_or(state.cpu.regs.pc);
        let EmuState { bus, debugger, .. } = &mut *state;
        let mut view = DebuggerBus { bus, debugger };
        mos6502::disassemble(&mut view, start, lines)
    }

    pub fn fill(&self, start: u16, end: u16, byte: u8) {
        let mut state = self.inner.lock();
        let mut addr = start;
        loop {
            let EmuState { bus, debugger, .. } = &mut *state;
            debugger.write_through(bus, addr, byte);
            if addr == end {
                break;
            }
            addr = addr.wrapping_add(1);
        }
    }
}

/// Adapts a [`MemoryMap`] + [`DebugCore`] pair into a single [`Bus`] for
/// the disassembler, so reads transparently see the original byte under a
/// substituted breakpoint instead of its trap opcode.
struct DebuggerBus<'a> {
    bus: &'a mut MemoryMap,
    debugger: &'a mut DebugCore,
}

impl Bus for DebuggerBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        self.debugger.read_through(self.bus, addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.debugger.write_through(self.bus, addr, value);
    }

    fn classify(&self, addr: u16) -> mos6502::AddressClass {
        self.bus.classify(addr)
    }
}

fn to_wire(regs: mos6502::Registers) -> RegisterFile {
    RegisterFile {
        a: regs.a,
        x: regs.x,
        y: regs.y,
        s: regs.s,
        p: regs.p,
        pc: regs.pc,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn facade_with_program() -> EmuFacade {
        let facade = EmuFacade::new(Some(&[0u8; 0x2800]));
        // reset vector -> $0600, then LDA #$05; STA $0610; loop: JMP loop
        facade.write_block(0xFFFC, &[0x00, 0x06]);
        facade.write_block(0x0600, &[0xA9, 0x05, 0x8D, 0x10, 0x06, 0x4C, 0x05, 0x06]);
        facade.reset(true);
        facade
    }

    #[test]
    fn step_one_instruction_executes_and_reports_cycles() {
        let facade = facade_with_program();
        let (cycles, outcome) = facade.step_one_instruction().unwrap();
        assert!(cycles > 0);
        assert_eq!(outcome, FrameOutcome::Ok);
        assert_eq!(facade.get_registers().a, 0x05);
    }

    #[test]
    fn breakpoint_passthrough_halts_advance_one_frame() {
        let facade = facade_with_program();
        facade.set_breakpoint(0x0602).unwrap();
        match facade.advance_one_frame().unwrap() {
            FrameOutcome::Breakpoint { address, .. } => assert_eq!(address, 0x0602),
            other => panic!("expected a breakpoint outcome, got {other:?}"),
        }
    }

    #[test]
    fn set_registers_is_refused_while_running() {
        let facade = facade_with_program();
        facade.resume().unwrap();
        let err = facade
            .set_registers(aesp_wire::payloads::RegisterMask::A, RegisterFile::default())
            .unwrap_err();
        assert_eq!(err, StateError::MustPause);
    }

    #[test]
    fn breakpoint_edits_are_refused_while_running() {
        let facade = facade_with_program();
        facade.resume().unwrap();

        assert_eq!(
            facade.set_breakpoint(0x0602).unwrap_err(),
            debugger_core::DebuggerError::MustPause
        );
        assert_eq!(
            facade.clear_breakpoint(0x0602).unwrap_err(),
            debugger_core::DebuggerError::MustPause
        );
        assert_eq!(
            facade.clear_all_breakpoints().unwrap_err(),
            debugger_core::DebuggerError::MustPause
        );
        assert_eq!(
            facade.enable_breakpoint(0x0602).unwrap_err(),
            debugger_core::DebuggerError::MustPause
        );
        assert_eq!(
            facade.disable_breakpoint(0x0602).unwrap_err(),
            debugger_core::DebuggerError::MustPause
        );
    }

    #[test]
    fn save_and_restore_state_round_trips_registers_and_memory() {
        let facade = facade_with_program();
        facade.step_one_instruction().unwrap();
        let blob = facade.save_state();

        let restored = EmuFacade::new(None);
        restored.restore_state(&blob).unwrap();
        assert_eq!(restored.get_registers().a, 0x05);
        assert_eq!(restored.read_byte(0x0600), 0xA9);
    }

    #[test]
    fn pending_input_is_latched_at_the_next_frame() {
        let facade = facade_with_program();
        let mut input = PendingInput::new();
        input.set_console_keys(aesp_wire::payloads::ConsoleKeysPayload {
            start: true,
            select: false,
            option: false,
        });
        facade.apply_pending_input(input);
        assert!(facade.applied_input().console_keys.is_none());
        facade.advance_one_frame().unwrap();
        assert!(facade.applied_input().console_keys.is_some());
    }

    #[test]
    fn unmount_reports_whether_a_disk_was_present() {
        let facade = facade_with_program();
        facade.mount_disk(1, "/disks/dos.atr".to_string());
        assert!(facade.unmount_disk(1));
        assert!(!facade.unmount_disk(1));
    }

    #[test]
    fn disassemble_shows_the_original_byte_under_a_live_trap() {
        let facade = facade_with_program();
        facade.set_breakpoint(0x0600).unwrap();
        let lines = facade.disassemble(Some(0x0600), 1);
        assert_eq!(lines, vec![(0x0600, "LDA #$05".to_string())]);
    }

    #[test]
    fn fill_writes_every_address_in_the_inclusive_range() {
        let facade = facade_with_program();
        facade.fill(0x0700, 0x0702, 0xEA);
        assert_eq!(facade.read_block(0x0700, 3), vec![0xEA, 0xEA, 0xEA]);
    }

    #[test]
    fn staged_key_events_merge_rather_than_replace() {
        let facade = facade_with_program();
        facade.stage_key(
            KeyEventPayload {
                key_char: b'A',
                key_code: 0x01,
                shift: false,
                control: false,
            },
            true,
        );
        facade.stage_joystick(JoystickPayload {
            port: 0,
            up: true,
            down: false,
            left: false,
            right: false,
            trigger: false,
        });
        facade.advance_one_frame().unwrap();
        let applied = facade.applied_input();
        assert_eq!(applied.key_events.len(), 1);
        assert_eq!(applied.joystick.len(), 1);
    }

    #[test]
    fn take_frame_copies_out_the_rendered_buffer() {
        let facade = facade_with_program();
        facade.advance_one_frame().unwrap();
        let (w, h) = facade.frame_dimensions();
        let mut buf = vec![0u8; usize::from(w) * usize::from(h)];
        facade.take_frame(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
    }
}
