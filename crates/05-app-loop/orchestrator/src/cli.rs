//! The local CLI endpoint: newline-delimited `CMD:`/`OK:`/`ERR:`/`EVENT:`
//! framing over a discoverable per-process socket. Calls the same
//! [`ControlHandler`] the binary control channel uses, so the two
//! surfaces can never drift apart, and renders replies with
//! [`inspector_vm`]'s shared view-model formatting.

use std::sync::Arc;
use std::time::Duration;

use aesp_proto::{ControlCmd, ControlRep, DebugEvent, HaltReason};
use inspector_vm::{render_breakpoints, render_memory, render_registers, render_status};
use net_io::ClientId;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

use crate::control::{ControlHandler, Notification};

/// Requests longer than this are rejected rather than read to completion.
pub const MAX_REQUEST_BYTES: usize = 4096;

/// Read timeout for an ordinary request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read timeout for a `ping` request specifically.
pub const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Services one CLI connection until EOF or an oversized request. Runs the
/// read loop and the event-broadcast relay concurrently so an `EVENT:`
/// line can interleave between replies without waiting for the next
/// request. `events` is shared with every other CLI connection and with
/// the frame loop; its payload is only a wake-up signal, since the real,
/// possibly-coalesced notification for this connection lives in its own
/// slot of `handler`'s [`debugger_core::EventSink`], so a lagged receiver
/// never drops an event outright, only coalesces it with a `lost_count`.
pub async fn handle_connection<S>(stream: S, handler: Arc<ControlHandler>, events: broadcast::Sender<Notification>)
where
    S: tokio::io::AsyncRead + AsyncWrite + Unpin,
{
    let client = ClientId::next();
    handler.register_cli_listener(client);

    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();
    let mut incoming = events.subscribe();

    loop {
        tokio::select! {
            biased;

            woken = incoming.recv() => {
                match woken {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if let Some((notification, lost)) = handler.drain_cli_listener(client) {
                            let line = render_event_line(&notification, lost);
                            if write_half.write_all(line.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            line = read_request_line(&mut lines) => {
                let Some(line) = line else { break };
                let (reply, notification) = dispatch(&line, &handler);
                if write_half.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
                if let Some(notification) = notification {
                    handler.publish_to_cli_listeners(&notification);
                    let _ = events.send(notification);
                }
            }
        }
    }

    handler.deregister_cli_listener(client);
}

async fn read_request_line<R>(lines: &mut tokio::io::Lines<BufReader<R>>) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    // Peek at the buffered bytes (without consuming them) to tell a `ping`
    // request from everything else before committing to a read deadline:
    // a ping is meant to be an immediate liveness check, so it gets the
    // stricter 1-second timeout instead of the generic 30 seconds.
    let timeout = match tokio::time::timeout(REQUEST_TIMEOUT, lines.get_mut().fill_buf()).await {
        Ok(Ok(peeked)) if peeked.starts_with(b"CMD:ping") || peeked.starts_with(b"CMD:version") => PING_TIMEOUT,
        Ok(Ok(_)) => REQUEST_TIMEOUT,
        Ok(Err(_io_error)) => return None,
        Err(_elapsed) => return None,
    };

    match tokio::time::timeout(timeout, lines.next_line()).await {
        Ok(Ok(Some(line))) if line.len() <= MAX_REQUEST_BYTES => Some(line),
        Ok(Ok(Some(_oversized))) => Some(String::new()),
        Ok(Ok(None)) => None,
        Ok(Err(_io_error)) => None,
        Err(_elapsed) => None,
    }
}

fn dispatch(line: &str, handler: &ControlHandler) -> (String, Option<Notification>) {
    let Some(body) = line.strip_prefix("CMD:") else {
        return ("ERR:request must start with CMD:\n".to_string(), None);
    };
    if body.is_empty() {
        return ("ERR:request must start with CMD:\n".to_string(), None);
    }

    match aesp_proto::parse_line(body) {
        Ok(cmd) => {
            let (rep, notification) = handler.handle(cmd.clone());
            (render_reply(&cmd, &rep, handler), notification)
        }
        Err(err) => {
            let reply = match err.hint {
                Some(hint) => format!("ERR:{} ({hint})\n", err.message),
                None => format!("ERR:{}\n", err.message),
            };
            (reply, None)
        }
    }
}

fn render_reply(cmd: &ControlCmd, rep: &ControlRep, handler: &ControlHandler) -> String {
    match rep {
        ControlRep::Error { message, .. } => format!("ERR:{message}\n"),
        ControlRep::Pong => "OK:pong\n".to_string(),
        ControlRep::Ack => "OK:\n".to_string(),
        ControlRep::Status(_) => format!("OK:{}\n", render_status(&handler.status_vm())),
        ControlRep::Memory(bytes) => {
            let base = match cmd {
                ControlCmd::ReadMemory { address, .. } => *address,
                _ => 0,
            };
            format!("OK:{}\n", render_memory(base, bytes))
        }
        ControlRep::Registers(registers) => format!("OK:{}\n", render_registers(registers)),
        ControlRep::Breakpoints(list) => {
            let vms: Vec<_> = list.iter().cloned().map(inspector_vm::BreakpointVM::from).collect();
            format!("OK:{}\n", render_breakpoints(&vms))
        }
        ControlRep::Drives(list) => {
            if list.is_empty() {
                "OK:no disks mounted\n".to_string()
            } else {
                let lines: Vec<String> = list
                    .iter()
                    .map(|(drive, path)| format!("drive {drive} -> {path}"))
                    .collect();
                format!("OK:{}\n", lines.join("\x1E"))
            }
        }
        ControlRep::Disassembly(lines) => format!("OK:{}\n", lines.join("\x1E")),
        ControlRep::Saved => "OK:state saved\n".to_string(),
        ControlRep::Loaded => "OK:state loaded\n".to_string(),
        ControlRep::Screenshot(path) => match path {
            Some(path) => format!("OK:screenshot written to {path}\n"),
            None => "OK:screenshot captured\n".to_string(),
        },
    }
}

fn render_event_line(notification: &Notification, lost: u32) -> String {
    if lost > 0 {
        format!("EVENT:{} (lost {lost})\n", render_notification(notification))
    } else {
        format!("EVENT:{}\n", render_notification(notification))
    }
}

fn render_notification(notification: &Notification) -> String {
    match notification {
        Notification::Debug(DebugEvent::Breakpoint { address, registers }) => {
            format!("breakpoint {} {}", aesp_proto::format_addr(*address), render_registers(registers))
        }
        Notification::Debug(DebugEvent::Stopped { address }) => {
            format!("stopped {}", aesp_proto::format_addr(*address))
        }
        Notification::Debug(DebugEvent::Error { message }) => format!("error {message}"),
        Notification::Halted(HaltReason::Breakpoint { address }) => {
            format!("breakpoint {}", aesp_proto::format_addr(*address))
        }
        Notification::Halted(HaltReason::Trap { address }) => {
            format!("stopped {}", aesp_proto::format_addr(*address))
        }
        Notification::Halted(HaltReason::UserRequested) => "halted user".to_string(),
        Notification::Halted(HaltReason::CpuFault) => "error cpu fault".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use net_io::QueuePolicy;
    use tokio::io::duplex;

    use crate::dispatcher::ChannelDispatcher;

    use super::*;

    fn handler() -> Arc<ControlHandler> {
        let facade = emu_facade::EmuFacade::new(Some(&[0u8; 0x2800]));
        facade.write_block(0xFFFC, &[0x00, 0x06]);
        facade.write_block(0x0600, &[0xA9, 0x05, 0x8D, 0x10, 0x06, 0x4C, 0x00, 0x06]);
        facade.reset(true);
        let facade = Arc::new(facade);
        let control = Arc::new(ChannelDispatcher::new(8, QueuePolicy::Block));
        let video = Arc::new(ChannelDispatcher::new(8, QueuePolicy::DropOldest));
        let audio = Arc::new(ChannelDispatcher::new(8, QueuePolicy::DropOldest));
        Arc::new(ControlHandler::new(
            facade,
            control,
            video,
            audio,
            crate::run_signal::RunSignal::new(),
        ))
    }

    #[test]
    fn dispatch_rejects_a_line_without_the_cmd_prefix() {
        assert_eq!(dispatch("ping", &handler()).0, "ERR:request must start with CMD:\n");
    }

    #[test]
    fn dispatch_renders_pong_for_ping() {
        assert_eq!(dispatch("CMD:ping", &handler()).0, "OK:pong\n");
    }

    #[test]
    fn dispatch_surfaces_parse_errors_with_their_hint() {
        let (reply, notification) = dispatch("CMD:frobnicate", &handler());
        assert!(reply.starts_with("ERR:"));
        assert!(reply.contains("hint"));
        assert!(notification.is_none());
    }

    #[test]
    fn a_breakpoint_hit_during_step_is_returned_as_a_notification() {
        let handler = handler();
        handler.handle(ControlCmd::Breakpoint(aesp_proto::BreakpointOp::Set { address: 0x0602 }));
        let (_reply, notification) = dispatch("CMD:step", &handler);
        assert!(matches!(notification, Some(Notification::Debug(DebugEvent::Breakpoint { .. }))));
    }

    #[tokio::test(start_paused = true)]
    async fn a_ping_prefixed_request_times_out_after_one_second() {
        let (mut client, server) = duplex(4096);
        let mut lines = BufReader::new(server).lines();
        // No trailing newline: the line never completes, so the read runs
        // out its full deadline. `client` is kept alive so the missing
        // newline times out instead of reading as a clean EOF.
        client.write_all(b"CMD:ping").await.unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(read_request_line(&mut lines).await, None);
        assert_eq!(started.elapsed(), PING_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn a_non_ping_request_times_out_after_thirty_seconds() {
        let (mut client, server) = duplex(4096);
        let mut lines = BufReader::new(server).lines();
        client.write_all(b"CMD:registers").await.unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(read_request_line(&mut lines).await, None);
        assert_eq!(started.elapsed(), REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn a_full_connection_replies_in_order_and_closes_on_eof() {
        let (mut client, server) = duplex(4096);
        let (tx, _rx) = broadcast::channel(8);
        let handler = handler();
        let task = tokio::spawn(handle_connection(server, handler, tx));

        client.write_all(b"CMD:ping\n").await.unwrap();
        client.write_all(b"CMD:registers\n").await.unwrap();
        drop(client);

        task.await.unwrap();
    }
}
