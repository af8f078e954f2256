//! Command-line client for the AESP local CLI endpoint: discovers the
//! running server's per-process socket, sends one `CMD:` line, and prints
//! the reply.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;

/// Text rendering for CLI replies.
mod render {
    /// Strips the `OK:`/`ERR:` framing and turns embedded record
    /// separators into newlines for terminal display.
    pub fn reply(line: &str) -> String {
        let body = line
            .strip_prefix("OK:")
            .or_else(|| line.strip_prefix("ERR:"))
            .unwrap_or(line);
        body.replace('\u{1E}', "\n")
    }

    pub fn is_error(line: &str) -> bool {
        line.starts_with("ERR:")
    }
}

/// Send a command to a running AESP server's CLI endpoint.
#[derive(Parser, Debug)]
#[command(author, version, about = "AESP CLI client", long_about = None)]
struct Cli {
    /// Directory the server's socket lives in.
    #[arg(long, default_value = "/tmp")]
    socket_dir: PathBuf,

    /// Filename prefix the server was started with.
    #[arg(long, default_value = "aesp")]
    socket_prefix: String,

    /// Connect to this socket directly, skipping discovery.
    #[arg(long)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Round-trip a ping.
    Ping,
    /// Report the server's protocol version.
    Version,
    /// Ask the server to close the current client connection's session.
    Quit,
    /// Ask the server process to exit.
    Shutdown,
    /// Pause emulation.
    Pause,
    /// Resume emulation.
    Resume,
    /// Advance one or more frames.
    Step {
        #[arg(default_value_t = 1)]
        frames: u32,
    },
    /// Reset the machine.
    Reset {
        #[arg(value_enum, default_value = "warm")]
        kind: ResetKind,
    },
    /// Report server and emulator status.
    Status,
    /// Read a block of memory.
    Read { addr: String, count: u16 },
    /// Write a block of memory.
    Write { addr: String, bytes: String },
    /// Read or assign CPU registers.
    Registers { assignments: Vec<String> },
    /// Manage breakpoints.
    Breakpoint {
        #[command(subcommand)]
        op: BreakpointOp,
    },
    /// Disassemble from an address.
    Disassemble {
        addr: Option<String>,
        lines: Option<u16>,
    },
    /// Assemble (hex bytes) at an address.
    Assemble { addr: String, instr: Vec<String> },
    /// Single-step over a subroutine call.
    Stepover,
    /// Run until an address is reached.
    Until { addr: String },
    /// Fill a memory range with a byte.
    Fill { start: String, end: String, byte: String },
    /// Mount a disk image.
    Mount { drive: String, path: String },
    /// Unmount a disk image.
    Unmount { drive: String },
    /// List mounted drives.
    Drives,
    /// Save or load emulator state.
    State {
        #[command(subcommand)]
        op: StateOp,
    },
    /// Capture a screenshot.
    Screenshot { path: Option<String> },
    /// Inject BASIC text or raw keystrokes.
    Inject {
        #[command(subcommand)]
        kind: InjectKind,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ResetKind {
    Cold,
    Warm,
}

#[derive(Subcommand, Debug)]
enum BreakpointOp {
    Set { addr: String },
    Clear { addr: String },
    Clearall,
    List,
}

#[derive(Subcommand, Debug)]
enum StateOp {
    Save { path: String },
    Load { path: String },
}

#[derive(Subcommand, Debug)]
enum InjectKind {
    Basic { text: String },
    Keys { text: String },
}

fn render_command(command: &Command) -> String {
    match command {
        Command::Ping => "ping".to_string(),
        Command::Version => "version".to_string(),
        Command::Quit => "quit".to_string(),
        Command::Shutdown => "shutdown".to_string(),
        Command::Pause => "pause".to_string(),
        Command::Resume => "resume".to_string(),
        Command::Step { frames } => format!("step {frames}"),
        Command::Reset { kind } => match kind {
            ResetKind::Cold => "reset cold".to_string(),
            ResetKind::Warm => "reset warm".to_string(),
        },
        Command::Status => "status".to_string(),
        Command::Read { addr, count } => format!("read {addr} {count}"),
        Command::Write { addr, bytes } => format!("write {addr} {bytes}"),
        Command::Registers { assignments } => {
            if assignments.is_empty() {
                "registers".to_string()
            } else {
                format!("registers {}", assignments.join(" "))
            }
        }
        Command::Breakpoint { op } => match op {
            BreakpointOp::Set { addr } => format!("breakpoint set {addr}"),
            BreakpointOp::Clear { addr } => format!("breakpoint clear {addr}"),
            BreakpointOp::Clearall => "breakpoint clearall".to_string(),
            BreakpointOp::List => "breakpoint list".to_string(),
        },
        Command::Disassemble { addr, lines } => {
            let mut out = "disassemble".to_string();
            if let Some(addr) = addr {
                out.push(' ');
                out.push_str(addr);
            }
            if let Some(lines) = lines {
                out.push(' ');
                out.push_str(&lines.to_string());
            }
            out
        }
        Command::Assemble { addr, instr } => format!("assemble {addr} {}", instr.join(" ")),
        Command::Stepover => "stepover".to_string(),
        Command::Until { addr } => format!("until {addr}"),
        Command::Fill { start, end, byte } => format!("fill {start} {end} {byte}"),
        Command::Mount { drive, path } => format!("mount {drive} {path}"),
        Command::Unmount { drive } => format!("unmount {drive}"),
        Command::Drives => "drives".to_string(),
        Command::State { op } => match op {
            StateOp::Save { path } => format!("state save {path}"),
            StateOp::Load { path } => format!("state load {path}"),
        },
        Command::Screenshot { path } => match path {
            Some(path) => format!("screenshot {path}"),
            None => "screenshot".to_string(),
        },
        Command::Inject { kind } => match kind {
            InjectKind::Basic { text } => format!("inject basic {text}"),
            InjectKind::Keys { text } => format!("inject keys {text}"),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let socket_path = match &cli.socket {
        Some(path) => path.clone(),
        None => discover_socket(&cli.socket_dir, &cli.socket_prefix)?,
    };

    let stream = UnixStream::connect(&socket_path)
        .await
        .with_context(|| format!("failed to connect to {socket_path:?}"))?;
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let request = format!("CMD:{}\n", render_command(&cli.command));
    write_half.write_all(request.as_bytes()).await?;

    let read_timeout = match cli.command {
        Command::Ping => Duration::from_secs(1),
        _ => Duration::from_secs(30),
    };

    // Event lines may be interleaved before the reply; skip any until the
    // first OK:/ERR: line, which is this request's own reply.
    loop {
        let line = timeout(read_timeout, lines.next_line())
            .await
            .context("timed out waiting for a reply")?
            .context("connection closed before a reply arrived")?
            .ok_or_else(|| anyhow!("connection closed before a reply arrived"))?;

        if line.starts_with("EVENT:") {
            eprintln!("{}", render::reply(&line));
            continue;
        }

        println!("{}", render::reply(&line));
        if render::is_error(&line) {
            bail!("server reported an error");
        }
        break;
    }

    Ok(())
}

/// Scans `dir` for `<prefix>-<pid>.sock` files, keeping only ones whose
/// pid still has a live `/proc/<pid>` entry, and returns the most
/// recently modified.
fn discover_socket(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(dir).with_context(|| format!("failed to read {dir:?}"))?;

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(rest) = name.strip_prefix(prefix).and_then(|r| r.strip_prefix('-')) else {
            continue;
        };
        let Some(pid_str) = rest.strip_suffix(".sock") else {
            continue;
        };
        let Ok(pid) = pid_str.parse::<u32>() else {
            continue;
        };
        if !process_is_alive(pid) {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                candidates.push((modified, path));
            }
        }
    }

    candidates
        .into_iter()
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
        .ok_or_else(|| anyhow!("no live AESP server socket found in {dir:?} with prefix '{prefix}'"))
}

#[cfg(target_os = "linux")]
fn process_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn ping_renders_bare_verb() {
        assert_eq!(render_command(&Command::Ping), "ping");
    }

    #[test]
    fn step_renders_frame_count() {
        assert_eq!(render_command(&Command::Step { frames: 3 }), "step 3");
    }

    #[test]
    fn breakpoint_set_renders_address() {
        assert_eq!(
            render_command(&Command::Breakpoint {
                op: BreakpointOp::Set {
                    addr: "$0602".to_string()
                }
            }),
            "breakpoint set $0602"
        );
    }

    #[test]
    fn reply_render_strips_ok_prefix_and_expands_record_separators() {
        assert_snapshot!(render::reply("OK:line one\u{1E}line two"), @"line one\nline two");
    }

    #[test]
    fn reply_render_strips_err_prefix() {
        assert_snapshot!(render::reply("ERR:bad address (hint: use $NNNN)"), @"bad address (hint: use $NNNN)");
    }

    #[test]
    fn is_error_detects_err_prefix() {
        assert!(render::is_error("ERR:oops"));
        assert!(!render::is_error("OK:fine"));
    }
}
