//! A wake-up for the frame loop, distinct from [`emu_facade::EmuFacade`]'s
//! own `running` flag. The façade stays the single source of truth for
//! whether the emulator is running; this just lets `resume`/`pause`
//! interrupt the loop's sleep instead of it polling.

use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct RunSignal(Arc<Notify>);

impl RunSignal {
    pub fn new() -> Self {
        Self(Arc::new(Notify::new()))
    }

    /// Wakes a frame loop currently parked in [`RunSignal::wait`].
    pub fn notify(&self) {
        self.0.notify_one();
    }

    pub async fn wait(&self) {
        self.0.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_wakes_a_pending_wait() {
        let signal = RunSignal::new();
        let waiter = signal.clone();
        let task = tokio::spawn(async move {
            waiter.wait().await;
        });
        tokio::task::yield_now().await;
        signal.notify();
        task.await.unwrap();
    }
}
