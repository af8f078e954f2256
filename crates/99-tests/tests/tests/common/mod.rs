//! Shared scenario harness: façade/dispatcher/handler wiring, plus thin
//! helpers for driving the binary control channel and the CLI endpoint
//! over in-process duplex pairs, so these tests never need a real TCP
//! or Unix socket.

use std::sync::Arc;

use aesp_wire::{decode, encode, Frame, MessageType};
use emu_facade::EmuFacade;
use net_io::{ClientId, QueuePolicy};
use orchestrator::{
    error_payload, frame_to_cmd, notification_to_frame, rep_to_frame, ChannelDispatcher,
    ControlHandler, Notification, RunSignal,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::sync::{broadcast, mpsc};

/// One façade behind the three dispatchers a real server exposes,
/// sharing the handler the binary and CLI surfaces both call through.
pub struct Harness {
    pub facade: Arc<EmuFacade>,
    pub control: Arc<ChannelDispatcher>,
    pub video: Arc<ChannelDispatcher>,
    pub audio: Arc<ChannelDispatcher>,
    pub handler: Arc<ControlHandler>,
}

impl Harness {
    pub fn new(facade: EmuFacade) -> Self {
        let facade = Arc::new(facade);
        let control = Arc::new(ChannelDispatcher::new(16, QueuePolicy::Block));
        let video = Arc::new(ChannelDispatcher::new(8, QueuePolicy::DropOldest));
        let audio = Arc::new(ChannelDispatcher::new(8, QueuePolicy::DropOldest));
        let handler = Arc::new(ControlHandler::new(
            facade.clone(),
            control.clone(),
            video.clone(),
            audio.clone(),
            RunSignal::new(),
        ));
        Self {
            facade,
            control,
            video,
            audio,
            handler,
        }
    }
}

/// Builds a façade whose reset vector points at `$0600` with `program`
/// loaded there, the convention every lower-crate unit test already uses.
pub fn ram_program_facade(program: &[u8]) -> EmuFacade {
    let facade = EmuFacade::new(Some(&[0u8; 0x2800]));
    facade.write_block(0xFFFC, &[0x00, 0x06]);
    facade.write_block(0x0600, program);
    facade.reset(true);
    facade
}

/// Builds a façade whose ROM image starts exactly at the default ROM
/// floor (`$D800`) with `rom_head` at its first byte, and whose reset
/// vector points at `$0600` with `entry` loaded there.
pub fn rom_program_facade(entry: &[u8], rom_head: &[u8]) -> EmuFacade {
    let mut rom = vec![0u8; 0x2800];
    rom[..rom_head.len()].copy_from_slice(rom_head);
    let facade = EmuFacade::new(Some(&rom));
    facade.write_block(0xFFFC, &[0x00, 0x06]);
    facade.write_block(0x0600, entry);
    facade.reset(true);
    facade
}

/// Drives one binary control-channel connection exactly the way the
/// server binary's accept loop does: decode a frame, translate it
/// through the shared handler, encode the reply, mirror any resulting
/// notification onto the control channel as an event frame.
pub async fn run_binary_control_connection(
    stream: DuplexStream,
    client: ClientId,
    dispatcher: Arc<ChannelDispatcher>,
    handler: Arc<ControlHandler>,
) {
    let queue = dispatcher.register(client, true);
    let (read_half, write_half) = tokio::io::split(stream);
    let writer = tokio::spawn(net_io::writer_loop(write_half, queue.clone()));
    let (tx, mut rx) = mpsc::channel::<(ClientId, Frame)>(32);
    let reader = tokio::spawn(net_io::reader_loop(read_half, client, tx, queue.clone()));

    while let Some((_sender, frame)) = rx.recv().await {
        match frame_to_cmd(&frame) {
            Some(cmd) => {
                let (rep, notification) = handler.handle(cmd);
                let reply = rep_to_frame(&rep);
                dispatcher.send_to(client, reply.kind, &reply.payload).await;
                if let Some(notification) = notification {
                    let wire_frame = notification_to_frame(&notification);
                    dispatcher
                        .broadcast(wire_frame.kind, &wire_frame.payload, false)
                        .await;
                }
            }
            None => {
                dispatcher
                    .send_to(
                        client,
                        MessageType::Error,
                        &error_payload(aesp_proto::ErrorKind::Protocol, "not valid on the control channel"),
                    )
                    .await;
            }
        }
    }

    dispatcher.deregister(client);
    let _ = reader.await;
    let _ = writer.await;
}

/// Writes one request frame and decodes the next frame back; for tests
/// that only need a single round trip on the binary control channel.
pub async fn roundtrip(client: &mut DuplexStream, kind: MessageType, payload: &[u8]) -> Frame {
    client.write_all(&encode(kind, payload)).await.unwrap();
    decode(client).await.unwrap()
}

/// A CLI-endpoint client over an in-process duplex pair, reading
/// newline-delimited replies the same way the real `aesp-cli` binary does.
pub struct CliClient {
    write: WriteHalf<DuplexStream>,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
}

impl CliClient {
    /// Sends one `CMD:` line and returns its `OK:`/`ERR:` reply line.
    /// Any `EVENT:` line the request's own side effects produce is
    /// written on a later loop iteration of the server's connection
    /// handler, after the reply, so it is never seen here — call
    /// [`CliClient::read_line`] afterward to collect it.
    pub async fn send(&mut self, body: &str) -> String {
        self.write
            .write_all(format!("CMD:{body}\n").as_bytes())
            .await
            .unwrap();
        self.read_line().await
    }

    pub async fn read_line(&mut self) -> String {
        self.lines
            .next_line()
            .await
            .unwrap()
            .expect("CLI connection closed unexpectedly")
    }
}

/// Spawns a CLI connection against `handler` over an in-process duplex
/// pair, returning the client side and the server task's join handle.
pub fn spawn_cli_connection(handler: Arc<ControlHandler>) -> (CliClient, tokio::task::JoinHandle<()>) {
    let (client, server) = tokio::io::duplex(4096);
    let (events_tx, _events_rx) = broadcast::channel::<Notification>(32);
    let join = tokio::spawn(orchestrator::handle_cli_connection(server, handler, events_tx));
    let (read_half, write_half) = tokio::io::split(client);
    let lines = BufReader::new(read_half).lines();
    (CliClient { write: write_half, lines }, join)
}
