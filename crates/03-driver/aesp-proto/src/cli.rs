//! The CLI grammar: `CMD:<verb> [args...]` parsed into the same
//! [`ControlCmd`] the binary control channel uses, so the two surfaces
//! cannot drift apart.

use aesp_wire::payloads::{RegisterFile, SetRegistersPayload};

use crate::cmd::{BreakpointOp, ControlCmd, SubChannel};
use crate::error::ParseError;

/// Parses one CLI request line (without the trailing `CMD:` prefix or
/// newline) into a [`ControlCmd`].
pub fn parse_line(line: &str) -> Result<ControlCmd, ParseError> {
    let mut parts = line.split_whitespace();
    let verb = parts
        .next()
        .ok_or_else(|| ParseError::new("empty command"))?;
    let rest: Vec<&str> = parts.collect();

    match verb {
        "ping" => Ok(ControlCmd::Ping),
        "version" => Ok(ControlCmd::Ping),
        "quit" => Ok(ControlCmd::Quit),
        "shutdown" => Ok(ControlCmd::Shutdown),
        "pause" => Ok(ControlCmd::Pause),
        "resume" => Ok(ControlCmd::Resume),
        "step" => Ok(ControlCmd::Step {
            frames: optional_u32(&rest, 0)?.unwrap_or(1),
        }),
        "stepover" => Ok(ControlCmd::StepOver),
        "until" => Ok(ControlCmd::Until {
            address: require_addr(&rest, 0, "until")?,
        }),
        "reset" => Ok(ControlCmd::Reset {
            cold: match rest.first().copied() {
                None | Some("warm") => false,
                Some("cold") => true,
                Some(other) => {
                    return Err(ParseError::with_hint(
                        format!("unknown reset mode '{other}'"),
                        "use 'reset cold' or 'reset warm'",
                    ))
                }
            },
        }),
        "status" => Ok(ControlCmd::Status),
        "read" => {
            let address = require_addr(&rest, 0, "read")?;
            let count = require_u32(&rest, 1, "read")? as u16;
            Ok(ControlCmd::ReadMemory { address, count })
        }
        "write" => {
            let address = require_addr(&rest, 0, "write")?;
            let bytes = parse_byte_list(rest.get(1..).unwrap_or_default())?;
            Ok(ControlCmd::WriteMemory { address, bytes })
        }
        "registers" => {
            if rest.is_empty() {
                Ok(ControlCmd::GetRegisters)
            } else {
                Ok(ControlCmd::SetRegisters(parse_register_assignments(&rest)?))
            }
        }
        "breakpoint" => parse_breakpoint(&rest),
        "disassemble" => Ok(ControlCmd::Disassemble {
            address: optional_addr(&rest, 0)?,
            lines: optional_u32(&rest, 1)?.unwrap_or(10) as u16,
        }),
        "assemble" => {
            let address = require_addr(&rest, 0, "assemble")?;
            let text = rest.get(1..).unwrap_or_default().join(" ");
            Ok(ControlCmd::Assemble { address, text })
        }
        "fill" => {
            let start = require_addr(&rest, 0, "fill")?;
            let end = require_addr(&rest, 1, "fill")?;
            let byte = require_u32(&rest, 2, "fill")? as u8;
            Ok(ControlCmd::Fill { start, end, byte })
        }
        "mount" => {
            let drive = require_u32(&rest, 0, "mount")? as u8;
            let path = rest
                .get(1)
                .ok_or_else(|| ParseError::new("mount requires a path"))?
                .to_string();
            Ok(ControlCmd::MountDisk { drive, path })
        }
        "unmount" => Ok(ControlCmd::UnmountDisk {
            drive: require_u32(&rest, 0, "unmount")? as u8,
        }),
        "drives" => Ok(ControlCmd::ListDrives),
        "state" => {
            let path = rest
                .get(1)
                .ok_or_else(|| ParseError::new("state requires a path"))?
                .to_string();
            match rest.first().copied() {
                Some("save") => Ok(ControlCmd::SaveState { path }),
                Some("load") => Ok(ControlCmd::LoadState { path }),
                _ => Err(ParseError::with_hint(
                    "state requires 'save' or 'load'",
                    "usage: state {save|load} <path>",
                )),
            }
        }
        "screenshot" => Ok(ControlCmd::Screenshot {
            path: rest.first().map(|s| s.to_string()),
        }),
        "inject" => {
            let kind = rest
                .first()
                .ok_or_else(|| ParseError::new("inject requires 'basic' or 'keys'"))?;
            let data = rest.get(1..).unwrap_or_default().join(" ");
            match *kind {
                "basic" => Ok(ControlCmd::InjectBasic { text: data }),
                "keys" => Ok(ControlCmd::InjectKeys { text: data }),
                other => Err(ParseError::with_hint(
                    format!("unknown inject kind '{other}'"),
                    "use 'inject basic' or 'inject keys'",
                )),
            }
        }
        other => Err(ParseError::with_hint(
            format!("unknown command '{other}'"),
            "see the verb list in the CLI help",
        )),
    }
}

fn parse_breakpoint(rest: &[&str]) -> Result<ControlCmd, ParseError> {
    match rest.first().copied() {
        Some("set") => Ok(ControlCmd::Breakpoint(BreakpointOp::Set {
            address: require_addr(rest, 1, "breakpoint set")?,
        })),
        Some("clear") => Ok(ControlCmd::Breakpoint(BreakpointOp::Clear {
            address: require_addr(rest, 1, "breakpoint clear")?,
        })),
        Some("clearall") => Ok(ControlCmd::Breakpoint(BreakpointOp::ClearAll)),
        Some("list") => Ok(ControlCmd::Breakpoint(BreakpointOp::List)),
        Some(other) => Err(ParseError::with_hint(
            format!("unknown breakpoint sub-command '{other}'"),
            "use set, clear, clearall, or list",
        )),
        None => Err(ParseError::new("breakpoint requires a sub-command")),
    }
}

fn parse_register_assignments(rest: &[&str]) -> Result<SetRegistersPayload, ParseError> {
    use aesp_wire::payloads::RegisterMask;
    let mut mask = 0u8;
    let mut registers = RegisterFile::default();

    for token in rest {
        let (name, value) = token.split_once('=').ok_or_else(|| {
            ParseError::with_hint(
                format!("malformed register assignment '{token}'"),
                "expected NAME=$NN, e.g. A=$FF",
            )
        })?;
        let value = parse_hex_u32(value)?;
        match name.to_ascii_uppercase().as_str() {
            "A" => {
                registers.a = value as u8;
                mask |= RegisterMask::A;
            }
            "X" => {
                registers.x = value as u8;
                mask |= RegisterMask::X;
            }
            "Y" => {
                registers.y = value as u8;
                mask |= RegisterMask::Y;
            }
            "S" => {
                registers.s = value as u8;
                mask |= RegisterMask::S;
            }
            "P" => {
                registers.p = value as u8;
                mask |= RegisterMask::P;
            }
            "PC" => {
                registers.pc = value as u16;
                mask |= RegisterMask::PC;
            }
            other => {
                return Err(ParseError::with_hint(
                    format!("unknown register '{other}'"),
                    "valid registers are A, X, Y, S, P, PC",
                ))
            }
        }
    }

    Ok(SetRegistersPayload { mask, registers })
}

fn parse_byte_list(tokens: &[&str]) -> Result<Vec<u8>, ParseError> {
    let joined = tokens.join(" ");
    let mut out = Vec::new();
    for piece in joined.split(|c: char| c == ',' || c.is_whitespace()) {
        if piece.is_empty() {
            continue;
        }
        out.push(parse_hex_u32(piece)? as u8);
    }
    Ok(out)
}

fn require_addr(tokens: &[&str], index: usize, verb: &str) -> Result<u16, ParseError> {
    let token = tokens
        .get(index)
        .ok_or_else(|| ParseError::new(format!("{verb} requires an address argument")))?;
    Ok(parse_hex_u32(token)? as u16)
}

fn optional_addr(tokens: &[&str], index: usize) -> Result<Option<u16>, ParseError> {
    match tokens.get(index) {
        Some(token) => Ok(Some(parse_hex_u32(token)? as u16)),
        None => Ok(None),
    }
}

fn require_u32(tokens: &[&str], index: usize, verb: &str) -> Result<u32, ParseError> {
    let token = tokens
        .get(index)
        .ok_or_else(|| ParseError::new(format!("{verb} requires another argument")))?;
    parse_hex_u32(token)
}

fn optional_u32(tokens: &[&str], index: usize) -> Result<Option<u32>, ParseError> {
    match tokens.get(index) {
        Some(token) => Ok(Some(parse_hex_u32(token)?)),
        None => Ok(None),
    }
}

/// Parses `$NNNN`/`$NN` hex, or a bare decimal number.
fn parse_hex_u32(token: &str) -> Result<u32, ParseError> {
    if let Some(hex) = token.strip_prefix('$') {
        u32::from_str_radix(hex, 16)
            .map_err(|_| ParseError::new(format!("'{token}' is not valid hex")))
    } else {
        token
            .parse::<u32>()
            .map_err(|_| ParseError::new(format!("'{token}' is not a number")))
    }
}

/// Renders an address in the `$NNNN` form used throughout the CLI grammar.
pub fn format_addr(addr: u16) -> String {
    format!("${addr:04X}")
}

/// Renders a byte in the `$NN` form used throughout the CLI grammar.
pub fn format_byte(byte: u8) -> String {
    format!("${byte:02X}")
}
