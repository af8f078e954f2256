//! The orchestrator task: while running, advances the emulator one frame
//! at a time and broadcasts video/audio/debug events; while paused, waits
//! on the run signal instead of polling. Never holds the façade's lock
//! across a broadcast — every façade call here locks and releases
//! internally, so this falls out naturally as long as this module doesn't
//! introduce a lock of its own.

use std::sync::Arc;

use aesp_wire::payloads::HaltedPayload;
use aesp_wire::MessageType;
use emu_facade::{EmuFacade, FrameOutcome};
use mos6502::Cpu;

use crate::dispatcher::ChannelDispatcher;
use crate::run_signal::RunSignal;

pub struct FrameLoop {
    facade: Arc<EmuFacade>,
    video: Arc<ChannelDispatcher>,
    audio: Arc<ChannelDispatcher>,
    control: Arc<ChannelDispatcher>,
    run_signal: RunSignal,
}

impl FrameLoop {
    pub fn new(
        facade: Arc<EmuFacade>,
        video: Arc<ChannelDispatcher>,
        audio: Arc<ChannelDispatcher>,
        control: Arc<ChannelDispatcher>,
        run_signal: RunSignal,
    ) -> Self {
        Self {
            facade,
            video,
            audio,
            control,
            run_signal,
        }
    }

    /// Runs forever. Intended to be spawned as its own task and left
    /// running for the server's lifetime; there is no clean-stop signal
    /// beyond dropping the task on shutdown.
    pub async fn run(&self) {
        loop {
            if !self.facade.is_running() {
                self.run_signal.wait().await;
                continue;
            }

            match self.facade.advance_one_frame() {
                Ok(FrameOutcome::Ok) => {
                    self.publish_frame().await;
                }
                Ok(FrameOutcome::Breakpoint { address, registers }) => {
                    self.publish_frame().await;
                    self.facade.pause();
                    self.emit_breakpoint(address, registers.encode().to_vec())
                        .await;
                }
                Ok(FrameOutcome::Stopped { address }) => {
                    self.publish_frame().await;
                    self.facade.pause();
                    self.emit_halted(HaltedPayload::REASON_STOPPED, address).await;
                }
                Ok(FrameOutcome::CpuFault(_message)) => {
                    self.facade.pause();
                    self.emit_halted(HaltedPayload::REASON_CPU_FAULT, 0).await;
                }
                Err(_rom_missing) => {
                    self.facade.pause();
                    self.run_signal.wait().await;
                }
            }

            tokio::task::yield_now().await;
        }
    }

    async fn publish_frame(&self) {
        let (w, h) = self.facade.frame_dimensions();
        let mut frame = vec![0u8; usize::from(w) * usize::from(h)];
        self.facade.take_frame(&mut frame);
        self.video.broadcast(MessageType::FrameRaw, &frame, true).await;

        let mut audio = vec![0i16; Cpu::AUDIO_SAMPLES_PER_FRAME];
        self.facade.take_audio(&mut audio);
        let audio_bytes: Vec<u8> = audio.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.audio.broadcast(MessageType::AudioPcm, &audio_bytes, true).await;
    }

    async fn emit_breakpoint(&self, address: u16, registers: Vec<u8>) {
        let mut payload = Vec::with_capacity(2 + registers.len());
        payload.extend_from_slice(&address.to_le_bytes());
        payload.extend_from_slice(&registers);
        self.control
            .broadcast(MessageType::Breakpoint, &payload, false)
            .await;
    }

    async fn emit_halted(&self, reason: u8, address: u16) {
        let payload = HaltedPayload { reason, address }.encode();
        self.control.broadcast(MessageType::Halted, &payload, false).await;
    }
}

#[cfg(test)]
mod tests {
    use net_io::QueuePolicy;

    use super::*;

    fn loaded_facade() -> Arc<EmuFacade> {
        let facade = EmuFacade::new(Some(&[0u8; 0x2800]));
        facade.write_block(0xFFFC, &[0x00, 0x06]);
        facade.write_block(0x0600, &[0xA9, 0x05, 0x8D, 0x10, 0x06, 0x4C, 0x00, 0x06]);
        facade.reset(true);
        Arc::new(facade)
    }

    #[tokio::test]
    async fn a_single_frame_advance_broadcasts_to_subscribed_video_clients() {
        let facade = loaded_facade();
        facade.resume().unwrap();
        let video = Arc::new(ChannelDispatcher::new(4, QueuePolicy::DropOldest));
        let audio = Arc::new(ChannelDispatcher::new(4, QueuePolicy::DropOldest));
        let control = Arc::new(ChannelDispatcher::new(4, QueuePolicy::Block));
        let client = net_io::ClientId::next();
        let queue = video.register(client, true);

        let frame_loop = FrameLoop::new(facade.clone(), video, audio, control, RunSignal::new());
        frame_loop.publish_frame().await;

        assert!(!queue.is_empty());
    }

    #[tokio::test]
    async fn a_breakpoint_hit_pauses_and_emits_on_the_control_channel() {
        let facade = loaded_facade();
        facade.set_breakpoint(0x0602).unwrap();
        facade.resume().unwrap();
        let video = Arc::new(ChannelDispatcher::new(4, QueuePolicy::DropOldest));
        let audio = Arc::new(ChannelDispatcher::new(4, QueuePolicy::DropOldest));
        let control = Arc::new(ChannelDispatcher::new(4, QueuePolicy::Block));
        let client = net_io::ClientId::next();
        let queue = control.register(client, true);

        match facade.advance_one_frame().unwrap() {
            FrameOutcome::Breakpoint { address, registers } => {
                facade.pause();
                let frame_loop =
                    FrameLoop::new(facade.clone(), video, audio, control, RunSignal::new());
                frame_loop
                    .emit_breakpoint(address, registers.encode().to_vec())
                    .await;
            }
            other => panic!("expected a breakpoint outcome, got {other:?}"),
        }

        assert!(!facade.is_running());
        assert!(!queue.is_empty());
    }
}
