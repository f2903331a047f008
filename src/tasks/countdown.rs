use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};

/// Called once per clock period. `Break` ends the loop for good.
#[async_trait]
pub(crate) trait TickHandler: Send + Sync + 'static {
    async fn on_tick(&self) -> ControlFlow<()>;
}

/// The single repeating task behind a running session clock.
///
/// Stopping is cooperative through a `watch` channel; dropping the handle aborts the
/// task so that no tick can land after its owner is gone.
#[derive(Debug)]
pub(crate) struct CountdownTask {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl CountdownTask {
    /// The first tick fires one full period after spawning.
    pub(crate) fn spawn<H: TickHandler>(handler: Arc<H>, period: Duration) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(handler, period, shutdown_rx));
        Self { shutdown, handle: Some(handle) }
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signals the loop and waits for it. A tick already being handled runs to completion.
    pub(crate) async fn stop(mut self) {
        if self.shutdown.send(true).is_err() {
            tracing::debug!("Countdown loop already finished");
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "Countdown task join failed");
            }
        }
    }
}

impl Drop for CountdownTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run<H: TickHandler>(
    handler: Arc<H>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticks = interval_at(Instant::now() + period, period);
    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticks.tick() => {
                if handler.on_tick().await.is_break() {
                    break;
                }
            }
        }
    }
    tracing::debug!("Countdown loop stopped");
}
