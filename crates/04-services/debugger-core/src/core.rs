use aesp_proto::DebugEvent;
use aesp_wire::payloads::RegisterFile;
use mos6502::{is_call_instruction, peek_instruction_len, AddressClass, Bus, Cpu, Registers, StepOutcome};

use crate::breakpoint::{Breakpoint, BreakpointKind, BreakpointTable, TemporaryBreakpoint};
use crate::error::DebuggerError;

/// Upper bound on instructions a single step-over/run-until call will
/// execute before giving up. Without it, a target address the program
/// never reaches would block the façade lock forever.
const MAX_RUN_UNTIL_STEPS: u32 = 20_000_000;

/// The outcome of a debugger-mediated step, surfaced to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugHalt {
    Normal,
    Breakpoint(DebugEvent),
    Stopped { address: u16 },
    CpuFault(String),
}

enum StepResolution {
    Normal,
    Breakpoint(DebugEvent),
    TemporaryReached,
    Stopped { address: u16 },
    CpuFault(String),
}

/// Owns the breakpoint table and the stepping state machine: continue-
/// from-breakpoint, single step, step-over, run-until. Knows nothing about
/// connections or channels — only a [`Bus`] and a [`Cpu`].
#[derive(Debug, Default)]
pub struct DebugCore {
    table: BreakpointTable,
    temporary: Option<TemporaryBreakpoint>,
    /// Set right after a substituted breakpoint halts execution; the next
    /// step at that same address performs the restore/step/reinstall
    /// dance instead of re-triggering the trap.
    resuming_from: Option<u16>,
}

impl DebugCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, bus: &mut impl Bus, addr: u16) -> Result<(), DebuggerError> {
        if self.table.contains(addr) {
            return Err(DebuggerError::AlreadyExists { address: addr });
        }
        let kind = match bus.classify(addr) {
            AddressClass::Writable => BreakpointKind::Substituted,
            AddressClass::Watched => BreakpointKind::Watched,
        };
        let saved_byte = if kind == BreakpointKind::Substituted {
            let original = bus.read(addr);
            bus.write(addr, 0x00);
            Some(original)
        } else {
            None
        };
        self.table.insert(
            addr,
            Breakpoint {
                kind,
                saved_byte,
                hit_count: 0,
                enabled: true,
            },
        );
        Ok(())
    }

    pub fn clear(&mut self, bus: &mut impl Bus, addr: u16) -> Result<(), DebuggerError> {
        let bp = self
            .table
            .remove(addr)
            .ok_or(DebuggerError::NotFound { address: addr })?;
        if bp.enabled && bp.kind == BreakpointKind::Substituted {
            if let Some(original) = bp.saved_byte {
                bus.write(addr, original);
            }
        }
        if self.resuming_from == Some(addr) {
            self.resuming_from = None;
        }
        Ok(())
    }

    pub fn clear_all(&mut self, bus: &mut impl Bus) {
        for addr in self.table.addresses() {
            let _ = self.clear(bus, addr);
        }
    }

    pub fn enable(&mut self, bus: &mut impl Bus, addr: u16) -> Result<(), DebuggerError> {
        let bp = self
            .table
            .get_mut(addr)
            .ok_or(DebuggerError::NotFound { address: addr })?;
        if bp.enabled {
            return Ok(());
        }
        bp.enabled = true;
        if bp.kind == BreakpointKind::Substituted {
            bus.write(addr, 0x00);
        }
        Ok(())
    }

    pub fn disable(&mut self, bus: &mut impl Bus, addr: u16) -> Result<(), DebuggerError> {
        let bp = self
            .table
            .get_mut(addr)
            .ok_or(DebuggerError::NotFound { address: addr })?;
        if !bp.enabled {
            return Ok(());
        }
        bp.enabled = false;
        if bp.kind == BreakpointKind::Substituted {
            if let Some(original) = bp.saved_byte {
                bus.write(addr, original);
            }
        }
        Ok(())
    }

    pub fn list(&self) -> smallvec::SmallVec<[aesp_proto::BreakpointInfo; 8]> {
        self.table.list()
    }

    pub fn breakpoint_count(&self) -> usize {
        self.table.len()
    }

    /// The value a client should see when reading `addr`: the original
    /// byte underneath a substituted trap, never the trap byte itself.
    pub fn read_through(&self, bus: &mut impl Bus, addr: u16) -> u8 {
        if let Some(original) = self.shadowed_byte(addr) {
            return original;
        }
        bus.read(addr)
    }

    /// A write to `addr` updates the shadowed original byte instead of the
    /// live trap byte, unless the breakpoint there is disabled (in which
    /// case the trap byte is not installed and the write goes straight
    /// through).
    pub fn write_through(&mut self, bus: &mut impl Bus, addr: u16, value: u8) {
        if let Some(bp) = self.table.get_mut(addr) {
            if bp.kind == BreakpointKind::Substituted {
                bp.saved_byte = Some(value);
                if bp.enabled {
                    return;
                }
            }
        }
        if let Some(tb) = &mut self.temporary {
            if tb.address == addr && tb.kind == BreakpointKind::Substituted {
                tb.saved_byte = Some(value);
                return;
            }
        }
        bus.write(addr, value);
    }

    fn shadowed_byte(&self, addr: u16) -> Option<u8> {
        if let Some(bp) = self.table.get(addr) {
            if bp.enabled && bp.kind == BreakpointKind::Substituted {
                return bp.saved_byte;
            }
        }
        if let Some(tb) = &self.temporary {
            if tb.address == addr && tb.kind == BreakpointKind::Substituted {
                return tb.saved_byte;
            }
        }
        None
    }

    /// Advances exactly one instruction, honoring the continue-from-
    /// breakpoint dance if `cpu`'s PC sits on an unresolved trap.
    pub fn step_one(&mut self, cpu: &mut Cpu, bus: &mut impl Bus) -> DebugHalt {
        match self.step_resolution(cpu, bus) {
            StepResolution::Normal => DebugHalt::Normal,
            StepResolution::Breakpoint(event) => DebugHalt::Breakpoint(event),
            // Only reachable while a temporary breakpoint is installed,
            // which step_one never does on its own.
            StepResolution::TemporaryReached => DebugHalt::Normal,
            StepResolution::Stopped { address } => DebugHalt::Stopped { address },
            StepResolution::CpuFault(message) => DebugHalt::CpuFault(message),
        }
    }

    /// Single-steps unless PC holds a subroutine call, in which case it
    /// runs until the call returns.
    pub fn step_over(&mut self, cpu: &mut Cpu, bus: &mut impl Bus) -> DebugHalt {
        let pc = cpu.regs.pc;
        // Read the opcode through the shadow-byte lookup, not the live bus
        // directly: if `pc` sits on a substituted breakpoint, the live byte
        // is the trap (BRK), not the instruction actually there.
        let opcode = self.read_through(bus, pc);
        if !is_call_instruction(opcode) {
            return self.step_one(cpu, bus);
        }
        let len = u16::from(peek_instruction_len(opcode));
        let return_addr = pc.wrapping_add(len);
        self.install_temporary(bus, return_addr);
        let result = self.run_loop_until_temporary(cpu, bus);
        self.clear_temporary(bus);
        result
    }

    /// Runs until `address` is reached, regardless of the instruction
    /// currently at PC.
    pub fn run_until(&mut self, cpu: &mut Cpu, bus: &mut impl Bus, address: u16) -> DebugHalt {
        self.install_temporary(bus, address);
        let result = self.run_loop_until_temporary(cpu, bus);
        self.clear_temporary(bus);
        result
    }

    /// Cold reset clears every breakpoint (matching a fresh boot); warm
    /// reset leaves the table untouched.
    pub fn reset(&mut self, bus: &mut impl Bus, cold: bool) {
        if cold {
            self.clear_all(bus);
            self.clear_temporary(bus);
        }
        self.resuming_from = None;
    }

    fn install_temporary(&mut self, bus: &mut impl Bus, addr: u16) {
        let kind = match bus.classify(addr) {
            AddressClass::Writable => BreakpointKind::Substituted,
            AddressClass::Watched => BreakpointKind::Watched,
        };
        let saved_byte = if kind == BreakpointKind::Substituted {
            let original = bus.read(addr);
            bus.write(addr, 0x00);
            Some(original)
        } else {
            None
        };
        self.temporary = Some(TemporaryBreakpoint {
            address: addr,
            kind,
            saved_byte,
        });
    }

    fn clear_temporary(&mut self, bus: &mut impl Bus) {
        if let Some(tb) = self.temporary.take() {
            if tb.kind == BreakpointKind::Substituted {
                if let Some(original) = tb.saved_byte {
                    bus.write(tb.address, original);
                }
            }
            if self.resuming_from == Some(tb.address) {
                self.resuming_from = None;
            }
        }
    }

    fn run_loop_until_temporary(&mut self, cpu: &mut Cpu, bus: &mut impl Bus) -> DebugHalt {
        for _ in 0..MAX_RUN_UNTIL_STEPS {
            match self.step_resolution(cpu, bus) {
                StepResolution::Normal => continue,
                StepResolution::TemporaryReached => return DebugHalt::Normal,
                StepResolution::Breakpoint(event) => return DebugHalt::Breakpoint(event),
                StepResolution::Stopped { address } => return DebugHalt::Stopped { address },
                StepResolution::CpuFault(message) => return DebugHalt::CpuFault(message),
            }
        }
        DebugHalt::CpuFault(format!(
            "run-until exceeded {MAX_RUN_UNTIL_STEPS} steps without reaching the target"
        ))
    }

    fn step_resolution(&mut self, cpu: &mut Cpu, bus: &mut impl Bus) -> StepResolution {
        let pc = cpu.regs.pc;
        if self.resuming_from == Some(pc) {
            self.resuming_from = None;
            return self.execute_through_trap(cpu, bus, pc);
        }
        let (_, outcome) = cpu.step_instruction(bus);
        self.resolve(cpu, outcome)
    }

    fn execute_through_trap(&mut self, cpu: &mut Cpu, bus: &mut impl Bus, addr: u16) -> StepResolution {
        let saved = self.shadowed_byte(addr).unwrap_or(0);
        bus.write(addr, saved);
        let (_, outcome) = cpu.step_instruction(bus);
        if self.is_active_trap_at(addr) {
            bus.write(addr, 0x00);
        }
        self.resolve(cpu, outcome)
    }

    fn is_active_trap_at(&self, addr: u16) -> bool {
        self.table
            .get(addr)
            .map(|bp| bp.enabled && bp.kind == BreakpointKind::Substituted)
            .unwrap_or(false)
            || self
                .temporary
                .as_ref()
                .map(|tb| tb.address == addr && tb.kind == BreakpointKind::Substituted)
                .unwrap_or(false)
    }

    fn resolve(&mut self, cpu: &mut Cpu, outcome: StepOutcome) -> StepResolution {
        match outcome {
            StepOutcome::Trap => self.handle_trap(cpu),
            StepOutcome::CpuFault(message) => StepResolution::CpuFault(message),
            StepOutcome::Normal | StepOutcome::Recoverable => self.check_watched(cpu),
        }
    }

    fn handle_trap(&mut self, cpu: &mut Cpu) -> StepResolution {
        // BRK leaves PC one past the trap byte; rewind to the address that
        // actually holds the breakpoint so a subsequent step performs the
        // continue-from-breakpoint dance correctly.
        let addr = cpu.regs.pc.wrapping_sub(1);
        cpu.regs.pc = addr;

        if let Some(bp) = self.table.get_mut(addr) {
            if bp.enabled && bp.kind == BreakpointKind::Substituted {
                bp.hit_count += 1;
                self.resuming_from = Some(addr);
                return StepResolution::Breakpoint(DebugEvent::Breakpoint {
                    address: addr,
                    registers: to_wire_registers(cpu.regs),
                });
            }
        }
        if let Some(tb) = &self.temporary {
            if tb.address == addr && tb.kind == BreakpointKind::Substituted {
                return StepResolution::TemporaryReached;
            }
        }
        StepResolution::Stopped { address: addr }
    }

    fn check_watched(&mut self, cpu: &mut Cpu) -> StepResolution {
        let pc = cpu.regs.pc;
        if let Some(bp) = self.table.get_mut(pc) {
            if bp.enabled && bp.kind == BreakpointKind::Watched {
                bp.hit_count += 1;
                return StepResolution::Breakpoint(DebugEvent::Breakpoint {
                    address: pc,
                    registers: to_wire_registers(cpu.regs),
                });
            }
        }
        if let Some(tb) = &self.temporary {
            if tb.address == pc && tb.kind == BreakpointKind::Watched {
                return StepResolution::TemporaryReached;
            }
        }
        StepResolution::Normal
    }
}

fn to_wire_registers(regs: Registers) -> RegisterFile {
    RegisterFile {
        a: regs.a,
        x: regs.x,
        y: regs.y,
        s: regs.s,
        p: regs.p,
        pc: regs.pc,
    }
}
