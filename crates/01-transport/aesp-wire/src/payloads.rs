//! Fixed-layout payload (de)serialization for every message type with a
//! payload body. These are hand-rolled rather than run through a general
//! serializer because every field is fixed width and the byte order is
//! mixed (length-prefix fields are big-endian, matching the frame header's
//! convention; in-payload multi-byte fields are little-endian, matching the
//! 6502's native endianness).

/// `Reset` payload: a single byte, 0x01 for cold, 0x00 for warm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPayload {
    pub cold: bool,
}

impl ResetPayload {
    pub fn encode(self) -> [u8; 1] {
        [if self.cold { 0x01 } else { 0x00 }]
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        bytes.first().map(|b| ResetPayload { cold: *b != 0 })
    }
}

/// `KeyDown`/`KeyUp` payload: `keyChar, keyCode, flags` (bit0 shift, bit1 control).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEventPayload {
    pub key_char: u8,
    pub key_code: u8,
    pub shift: bool,
    pub control: bool,
}

impl KeyEventPayload {
    pub fn encode(self) -> [u8; 3] {
        let mut flags = 0u8;
        if self.shift {
            flags |= 0b01;
        }
        if self.control {
            flags |= 0b10;
        }
        [self.key_char, self.key_code, flags]
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }
        Some(KeyEventPayload {
            key_char: bytes[0],
            key_code: bytes[1],
            shift: bytes[2] & 0b01 != 0,
            control: bytes[2] & 0b10 != 0,
        })
    }
}

/// `Joystick` payload: `port, directions_bitmask, trigger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickPayload {
    pub port: u8,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub trigger: bool,
}

impl JoystickPayload {
    pub fn encode(self) -> [u8; 3] {
        let mut mask = 0u8;
        if self.up {
            mask |= 0b0001;
        }
        if self.down {
            mask |= 0b0010;
        }
        if self.left {
            mask |= 0b0100;
        }
        if self.right {
            mask |= 0b1000;
        }
        [self.port, mask, self.trigger as u8]
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }
        let mask = bytes[1];
        Some(JoystickPayload {
            port: bytes[0],
            up: mask & 0b0001 != 0,
            down: mask & 0b0010 != 0,
            left: mask & 0b0100 != 0,
            right: mask & 0b1000 != 0,
            trigger: bytes[2] != 0,
        })
    }
}

/// `ConsoleKeys` payload: a 1-byte bitmask (start, select, option).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleKeysPayload {
    pub start: bool,
    pub select: bool,
    pub option: bool,
}

impl ConsoleKeysPayload {
    pub fn encode(self) -> [u8; 1] {
        let mut mask = 0u8;
        if self.start {
            mask |= 0b001;
        }
        if self.select {
            mask |= 0b010;
        }
        if self.option {
            mask |= 0b100;
        }
        [mask]
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        bytes.first().map(|mask| ConsoleKeysPayload {
            start: mask & 0b001 != 0,
            select: mask & 0b010 != 0,
            option: mask & 0b100 != 0,
        })
    }
}

/// `ReadMemory` payload: `address(2B LE) count(2B LE)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadMemoryPayload {
    pub address: u16,
    pub count: u16,
}

impl ReadMemoryPayload {
    pub fn encode(self) -> [u8; 4] {
        let mut out = [0u8; 4];
        out[0..2].copy_from_slice(&self.address.to_le_bytes());
        out[2..4].copy_from_slice(&self.count.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }
        Some(ReadMemoryPayload {
            address: u16::from_le_bytes([bytes[0], bytes[1]]),
            count: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }
}

/// `WriteMemory` payload: `address(2B LE) bytes...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMemoryPayload {
    pub address: u16,
    pub bytes: Vec<u8>,
}

impl WriteMemoryPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.bytes.len());
        out.extend_from_slice(&self.address.to_le_bytes());
        out.extend_from_slice(&self.bytes);
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 2 {
            return None;
        }
        Some(WriteMemoryPayload {
            address: u16::from_le_bytes([bytes[0], bytes[1]]),
            bytes: bytes[2..].to_vec(),
        })
    }
}

/// The canonical 6502 register file, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct RegisterFile {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub p: u8,
    pub pc: u16,
}

impl RegisterFile {
    pub fn encode(self) -> [u8; 7] {
        let mut out = [0u8; 7];
        out[0] = self.a;
        out[1] = self.x;
        out[2] = self.y;
        out[3] = self.s;
        out[4] = self.p;
        out[5..7].copy_from_slice(&self.pc.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 7 {
            return None;
        }
        Some(RegisterFile {
            a: bytes[0],
            x: bytes[1],
            y: bytes[2],
            s: bytes[3],
            p: bytes[4],
            pc: u16::from_le_bytes([bytes[5], bytes[6]]),
        })
    }
}

/// Bitmask of which [`RegisterFile`] fields a `SetRegisters` request
/// carries. Unlisted fields must not be touched.
#[allow(non_snake_case)]
pub mod RegisterMask {
    pub const A: u8 = 0b0000_0001;
    pub const X: u8 = 0b0000_0010;
    pub const Y: u8 = 0b0000_0100;
    pub const S: u8 = 0b0000_1000;
    pub const P: u8 = 0b0001_0000;
    pub const PC: u8 = 0b0010_0000;
}

/// `SetRegisters` payload: a presence bitmask followed by the full register
/// file; only masked fields are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetRegistersPayload {
    pub mask: u8,
    pub registers: RegisterFile,
}

impl SetRegistersPayload {
    pub fn encode(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = self.mask;
        out[1..8].copy_from_slice(&self.registers.encode());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 8 {
            return None;
        }
        Some(SetRegistersPayload {
            mask: bytes[0],
            registers: RegisterFile::decode(&bytes[1..8])?,
        })
    }
}

/// `Breakpoint` event payload: the hit address followed by the full
/// register file at the moment of the halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointEventPayload {
    pub address: u16,
    pub registers: RegisterFile,
}

impl BreakpointEventPayload {
    pub fn encode(self) -> [u8; 9] {
        let mut out = [0u8; 9];
        out[0..2].copy_from_slice(&self.address.to_le_bytes());
        out[2..9].copy_from_slice(&self.registers.encode());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 9 {
            return None;
        }
        Some(BreakpointEventPayload {
            address: u16::from_le_bytes([bytes[0], bytes[1]]),
            registers: RegisterFile::decode(&bytes[2..9])?,
        })
    }
}

/// `Halted` event payload: a reason code (0 trap/stopped, 1 user-requested
/// pause, 2 CPU fault) followed by the halted address (0 when the reason
/// carries none, e.g. a CPU fault).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaltedPayload {
    pub reason: u8,
    pub address: u16,
}

impl HaltedPayload {
    pub const REASON_STOPPED: u8 = 0;
    pub const REASON_USER: u8 = 1;
    pub const REASON_CPU_FAULT: u8 = 2;

    pub fn encode(self) -> [u8; 3] {
        let mut out = [0u8; 3];
        out[0] = self.reason;
        out[1..3].copy_from_slice(&self.address.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }
        Some(HaltedPayload {
            reason: bytes[0],
            address: u16::from_le_bytes([bytes[1], bytes[2]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_payload_round_trips() {
        let cold = ResetPayload { cold: true };
        assert_eq!(ResetPayload::decode(&cold.encode()), Some(cold));
    }

    #[test]
    fn read_memory_payload_round_trips() {
        let req = ReadMemoryPayload {
            address: 0x0600,
            count: 16,
        };
        assert_eq!(ReadMemoryPayload::decode(&req.encode()), Some(req));
    }

    #[test]
    fn write_memory_payload_round_trips() {
        let req = WriteMemoryPayload {
            address: 0x0600,
            bytes: vec![0xA9, 0x00, 0x60],
        };
        assert_eq!(WriteMemoryPayload::decode(&req.encode()), Some(req));
    }

    #[test]
    fn register_file_round_trips() {
        let regs = RegisterFile {
            a: 0x10,
            x: 0x20,
            y: 0x30,
            s: 0xFD,
            p: 0x24,
            pc: 0xE477,
        };
        assert_eq!(RegisterFile::decode(&regs.encode()), Some(regs));
    }

    #[test]
    fn breakpoint_event_payload_round_trips() {
        let event = BreakpointEventPayload {
            address: 0xE477,
            registers: RegisterFile {
                a: 1,
                x: 2,
                y: 3,
                s: 0xFD,
                p: 0x24,
                pc: 0xE477,
            },
        };
        assert_eq!(BreakpointEventPayload::decode(&event.encode()), Some(event));
    }

    #[test]
    fn halted_payload_round_trips() {
        let halted = HaltedPayload {
            reason: HaltedPayload::REASON_CPU_FAULT,
            address: 0,
        };
        assert_eq!(HaltedPayload::decode(&halted.encode()), Some(halted));
    }

    #[test]
    fn set_registers_mask_marks_only_listed_fields() {
        let payload = SetRegistersPayload {
            mask: RegisterMask::A | RegisterMask::PC,
            registers: RegisterFile {
                a: 0x42,
                pc: 0x0600,
                ..Default::default()
            },
        };
        let decoded = SetRegistersPayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded.mask & RegisterMask::X, 0);
        assert_eq!(decoded.mask & RegisterMask::A, RegisterMask::A);
    }
}
