//! Binds the three AESP TCP channels and the local CLI socket, then runs
//! the frame loop until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::{TcpListener, TcpStream, UnixListener};
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use aesp_wire::{Frame, MessageType};
use emu_facade::EmuFacade;
use net_io::{ClientId, QueuePolicy};
use orchestrator::{
    error_payload, frame_to_cmd, notification_to_frame, rep_to_frame, run_video_audio_connection,
    ChannelDispatcher, ControlHandler, FrameLoop, Notification, RunSignal,
};

/// Runs an AESP server: the binary control/video/audio channels plus the
/// process-local CLI endpoint, fronting one emulator instance.
#[derive(Parser, Debug)]
#[command(author, version, about = "AESP emulator server", long_about = None)]
struct Args {
    /// ROM image to load at startup.
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Control channel bind address.
    #[arg(long, default_value = "0.0.0.0:47800")]
    control_addr: SocketAddr,

    /// Video channel bind address.
    #[arg(long, default_value = "0.0.0.0:47801")]
    video_addr: SocketAddr,

    /// Audio channel bind address.
    #[arg(long, default_value = "0.0.0.0:47802")]
    audio_addr: SocketAddr,

    /// Directory the CLI socket is created in.
    #[arg(long, default_value = "/tmp")]
    cli_socket_dir: PathBuf,

    /// Filename prefix for the CLI socket; the final path is
    /// `<dir>/<prefix>-<pid>.sock`.
    #[arg(long, default_value = "aesp")]
    cli_socket_prefix: String,

    /// Outbound queue depth for the control channel (blocking back-pressure).
    #[arg(long, default_value_t = 64)]
    control_queue_capacity: usize,

    /// Outbound queue depth for the video and audio channels (drop-oldest).
    #[arg(long, default_value_t = 8)]
    stream_queue_capacity: usize,

    /// Capacity of the broadcast channel feeding CLI `EVENT:` lines.
    #[arg(long, default_value_t = 256)]
    event_buffer: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let rom = match &args.rom {
        Some(path) => Some(std::fs::read(path).with_context(|| format!("failed to read ROM {path:?}"))?),
        None => None,
    };
    let facade = Arc::new(EmuFacade::new(rom.as_deref()));

    let control = Arc::new(ChannelDispatcher::new(args.control_queue_capacity, QueuePolicy::Block));
    let video = Arc::new(ChannelDispatcher::new(args.stream_queue_capacity, QueuePolicy::DropOldest));
    let audio = Arc::new(ChannelDispatcher::new(args.stream_queue_capacity, QueuePolicy::DropOldest));
    let run_signal = RunSignal::new();

    let handler = Arc::new(ControlHandler::new(
        facade.clone(),
        control.clone(),
        video.clone(),
        audio.clone(),
        run_signal.clone(),
    ));
    let (events_tx, _events_rx) = broadcast::channel::<Notification>(args.event_buffer);

    let frame_loop = Arc::new(FrameLoop::new(facade, video.clone(), audio.clone(), control.clone(), run_signal));
    tokio::spawn({
        let frame_loop = frame_loop.clone();
        async move { frame_loop.run().await }
    });

    let control_listener = TcpListener::bind(args.control_addr)
        .await
        .with_context(|| format!("failed to bind control channel on {}", args.control_addr))?;
    info!(addr = %args.control_addr, "control channel listening");
    tokio::spawn(accept_control(control_listener, control.clone(), handler.clone(), events_tx.clone()));

    let video_listener = TcpListener::bind(args.video_addr)
        .await
        .with_context(|| format!("failed to bind video channel on {}", args.video_addr))?;
    info!(addr = %args.video_addr, "video channel listening");
    tokio::spawn(accept_stream(
        video_listener,
        video,
        MessageType::VideoSubscribe,
        MessageType::VideoUnsubscribe,
    ));

    let audio_listener = TcpListener::bind(args.audio_addr)
        .await
        .with_context(|| format!("failed to bind audio channel on {}", args.audio_addr))?;
    info!(addr = %args.audio_addr, "audio channel listening");
    tokio::spawn(accept_stream(
        audio_listener,
        audio,
        MessageType::AudioSubscribe,
        MessageType::AudioUnsubscribe,
    ));

    let socket_path = args
        .cli_socket_dir
        .join(format!("{}-{}.sock", args.cli_socket_prefix, std::process::id()));
    let _ = std::fs::remove_file(&socket_path);
    let cli_listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("failed to bind CLI socket at {socket_path:?}"))?;
    info!(path = %socket_path.display(), "CLI endpoint listening");
    tokio::spawn(accept_cli(cli_listener, handler, events_tx));

    signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    warn!("received Ctrl+C, shutting down");
    let _ = std::fs::remove_file(&socket_path);

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env_filter).try_init();
}

/// Accepts control-channel connections, translating each decoded frame
/// through [`ControlHandler`] and mirroring any resulting notification to
/// every connected control client as a wire event frame.
async fn accept_control(
    listener: TcpListener,
    dispatcher: Arc<ChannelDispatcher>,
    handler: Arc<ControlHandler>,
    events: broadcast::Sender<Notification>,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "control accept failed");
                continue;
            }
        };
        info!(%peer, "control client connected");
        let dispatcher = dispatcher.clone();
        let handler = handler.clone();
        let events = events.clone();
        tokio::spawn(async move {
            run_control_connection(stream, dispatcher, handler, events).await;
        });
    }
}

async fn run_control_connection(
    stream: TcpStream,
    dispatcher: Arc<ChannelDispatcher>,
    handler: Arc<ControlHandler>,
    events: broadcast::Sender<Notification>,
) {
    let client = ClientId::next();
    let queue = dispatcher.register(client, true);
    let (read_half, write_half) = stream.into_split();
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
                    let _ = events.send(notification);
                }
            }
            None => {
                dispatcher
                    .send_to(
                        client,
                        MessageType::Error,
                        &error_payload(
                            aesp_proto::ErrorKind::Protocol,
                            &format!("{:?} is not valid on the control channel", frame.kind),
                        ),
                    )
                    .await;
            }
        }
    }

    dispatcher.deregister(client);
    let _ = reader.await;
    let _ = writer.await;
}

/// Accepts video/audio connections, handing each to the shared
/// subscribe/unsubscribe handler and deregistering it on close.
async fn accept_stream(
    listener: TcpListener,
    dispatcher: Arc<ChannelDispatcher>,
    subscribe: MessageType,
    unsubscribe: MessageType,
) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "stream accept failed");
                continue;
            }
        };
        info!(%peer, kind = ?subscribe, "stream client connected");
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            run_stream_connection(stream, dispatcher, subscribe, unsubscribe).await;
        });
    }
}

async fn run_stream_connection(
    stream: TcpStream,
    dispatcher: Arc<ChannelDispatcher>,
    subscribe: MessageType,
    unsubscribe: MessageType,
) {
    let client = ClientId::next();
    let queue = dispatcher.register(client, false);
    let (read_half, write_half) = stream.into_split();
    let writer = tokio::spawn(net_io::writer_loop(write_half, queue.clone()));

    let (tx, rx) = mpsc::channel::<(ClientId, Frame)>(32);
    let reader = tokio::spawn(net_io::reader_loop(read_half, client, tx, queue.clone()));

    run_video_audio_connection(dispatcher.clone(), client, rx, subscribe, unsubscribe).await;

    dispatcher.deregister(client);
    let _ = reader.await;
    let _ = writer.await;
}

async fn accept_cli(listener: UnixListener, handler: Arc<ControlHandler>, events: broadcast::Sender<Notification>) {
    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(%err, "CLI accept failed");
                continue;
            }
        };
        let handler = handler.clone();
        let events = events.clone();
        tokio::spawn(async move {
            orchestrator::handle_cli_connection(stream, handler, events).await;
        });
    }
}
