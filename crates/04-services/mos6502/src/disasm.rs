use crate::bus::Bus;

/// Disassembles one instruction at `addr`, returning its mnemonic text and
/// byte length. Addressing modes not implemented by [`crate::instr::execute`]
/// never appear in a running program, but an unrecognized byte still needs
/// a printable line, so it renders as a raw `.byte`.
pub fn disassemble_one(bus: &mut impl Bus, addr: u16) -> (String, u8) {
    let opcode = bus.read(addr);
    let len = crate::opcodes::INSTRUCTION_LEN[opcode as usize];
    let operand = |offset: u16| bus.read(addr.wrapping_add(offset));
    let imm8 = || format!("#${:02X}", operand(1));
    let zp = || format!("${:02X}", operand(1));
    let zpx = || format!("${:02X},X", operand(1));
    let abs = || {
        let lo = operand(1);
        let hi = operand(2);
        format!("${:04X}", u16::from_le_bytes([lo, hi]))
    };
    let absx = || {
        let lo = operand(1);
        let hi = operand(2);
        format!("${:04X},X", u16::from_le_bytes([lo, hi]))
    };
    let absy = || {
        let lo = operand(1);
        let hi = operand(2);
        format!("${:04X},Y", u16::from_le_bytes([lo, hi]))
    };
    let indx = || format!("(${:02X},X)", operand(1));
    let indy = || format!("(${:02X}),Y", operand(1));
    let ind = || {
        let lo = operand(1);
        let hi = operand(2);
        format!("(${:04X})", u16::from_le_bytes([lo, hi]))
    };
    let rel = || {
        let offset = operand(1) as i8;
        let target = addr.wrapping_add(2).wrapping_add(offset as u16);
        format!("${target:04X}")
    };

    let text = match opcode {
        0xA9 => format!("LDA {}", imm8()),
        0xA5 => format!("LDA {}", zp()),
        0xB5 => format!("LDA {}", zpx()),
        0xAD => format!("LDA {}", abs()),
        0xBD => format!("LDA {}", absx()),
        0xB9 => format!("LDA {}", absy()),
        0xA1 => format!("LDA {}", indx()),
        0xB1 => format!("LDA {}", indy()),
        0xA2 => format!("LDX {}", imm8()),
        0xA6 => format!("LDX {}", zp()),
        0xAE => format!("LDX {}", abs()),
        0xA0 => format!("LDY {}", imm8()),
        0xA4 => format!("LDY {}", zp()),
        0xAC => format!("LDY {}", abs()),
        0x85 => format!("STA {}", zp()),
        0x95 => format!("STA {}", zpx()),
        0x8D => format!("STA {}", abs()),
        0x9D => format!("STA {}", absx()),
        0x99 => format!("STA {}", absy()),
        0x81 => format!("STA {}", indx()),
        0x91 => format!("STA {}", indy()),
        0x86 => format!("STX {}", zp()),
        0x8E => format!("STX {}", abs()),
        0x84 => format!("STY {}", zp()),
        0x8C => format!("STY {}", abs()),
        0xAA => "TAX".to_string(),
        0x8A => "TXA".to_string(),
        0xA8 => "TAY".to_string(),
        0x98 => "TYA".to_string(),
        0xBA => "TSX".to_string(),
        0x9A => "TXS".to_string(),
        0xE8 => "INX".to_string(),
        0xC8 => "INY".to_string(),
        0xCA => "DEX".to_string(),
        0x88 => "DEY".to_string(),
        0xE6 => format!("INC {}", zp()),
        0xEE => format!("INC {}", abs()),
        0xC6 => format!("DEC {}", zp()),
        0xCE => format!("DEC {}", abs()),
        0x69 => format!("ADC {}", imm8()),
        0x65 => format!("ADC {}", zp()),
        0x6D => format!("ADC {}", abs()),
        0xE9 => format!("SBC {}", imm8()),
        0xE5 => format!("SBC {}", zp()),
        0xED => format!("SBC {}", abs()),
        0x29 => format!("AND {}", imm8()),
        0x25 => format!("AND {}", zp()),
        0x2D => format!("AND {}", abs()),
        0x09 => format!("ORA {}", imm8()),
        0x05 => format!("ORA {}", zp()),
        0x0D => format!("ORA {}", abs()),
        0x49 => format!("EOR {}", imm8()),
        0x45 => format!("EOR {}", zp()),
        0x4D => format!("EOR {}", abs()),
        0xC9 => format!("CMP {}", imm8()),
        0xC5 => format!("CMP {}", zp()),
        0xCD => format!("CMP {}", abs()),
        0xE0 => format!("CPX {}", imm8()),
        0xE4 => format!("CPX {}", zp()),
        0xEC => format!("CPX {}", abs()),
        0xC0 => format!("CPY {}", imm8()),
        0xC4 => format!("CPY {}", zp()),
        0xCC => format!("CPY {}", abs()),
        0x24 => format!("BIT {}", zp()),
        0x2C => format!("BIT {}", abs()),
        0x0A => "ASL A".to_string(),
        0x4A => "LSR A".to_string(),
        0x2A => "ROL A".to_string(),
        0x6A => "ROR A".to_string(),
        0xF0 => format!("BEQ {}", rel()),
        0xD0 => format!("BNE {}", rel()),
        0xB0 => format!("BCS {}", rel()),
        0x90 => format!("BCC {}", rel()),
        0x30 => format!("BMI {}", rel()),
        0x10 => format!("BPL {}", rel()),
        0x70 => format!("BVS {}", rel()),
        0x50 => format!("BVC {}", rel()),
        0x4C => format!("JMP {}", abs()),
        0x6C => format!("JMP {}", ind()),
        0x20 => format!("JSR {}", abs()),
        0x60 => "RTS".to_string(),
        0x48 => "PHA".to_string(),
        0x68 => "PLA".to_string(),
        0x08 => "PHP".to_string(),
        0x28 => "PLP".to_string(),
        0x18 => "CLC".to_string(),
        0x38 => "SEC".to_string(),
        0x58 => "CLI".to_string(),
        0x78 => "SEI".to_string(),
        0xB8 => "CLV".to_string(),
        0xD8 => "CLD".to_string(),
        0xF8 => "SED".to_string(),
        0xEA => "NOP".to_string(),
        0x00 => "BRK".to_string(),
        other => format!(".byte ${other:02X}"),
    };
    (text, len)
}

/// Disassembles `lines` consecutive instructions starting at `start`,
/// returning each line's address alongside its rendered text.
pub fn disassemble(bus: &mut impl Bus, start: u16, lines: u16) -> Vec<(u16, String)> {
    let mut out = Vec::with_capacity(lines as usize);
    let mut addr = start;
    for _ in 0..lines {
        let (text, len) = disassemble_one(bus, addr);
        out.push((addr, text));
        addr = addr.wrapping_add(u16::from(len.max(1)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryMap;

    #[test]
    fn disassembles_lda_immediate() {
        let mut bus = MemoryMap::with_defaults();
        bus.load_at(0x0600, &[0xA9, 0x05]);
        let (text, len) = disassemble_one(&mut bus, 0x0600);
        assert_eq!(text, "LDA #$05");
        assert_eq!(len, 2);
    }

    #[test]
    fn disassembles_a_branch_to_its_absolute_target() {
        let mut bus = MemoryMap::with_defaults();
        bus.load_at(0x0600, &[0xF0, 0x02]); // BEQ +2 -> $0604
        let (text, _) = disassemble_one(&mut bus, 0x0600);
        assert_eq!(text, "BEQ $0604");
    }

    #[test]
    fn disassembles_multiple_lines_in_sequence() {
        let mut bus = MemoryMap::with_defaults();
        bus.load_at(0x0600, &[0xA9, 0x05, 0x8D, 0x10, 0x06, 0xEA]);
        let lines = disassemble(&mut bus, 0x0600, 3);
        assert_eq!(
            lines,
            vec![
                (0x0600, "LDA #$05".to_string()),
                (0x0602, "STA $0610".to_string()),
                (0x0605, "NOP".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_opcode_renders_as_a_byte_directive() {
        let mut bus = MemoryMap::with_defaults();
        bus.load_at(0x0600, &[0xFF]);
        let (text, len) = disassemble_one(&mut bus, 0x0600);
        assert_eq!(text, ".byte $FF");
        assert_eq!(len, 1);
    }
}
