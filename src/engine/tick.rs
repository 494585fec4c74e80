//! Background tick driver
//!
//! Periodically calls [`Engine::tick`] so FixedDuration/AutomatedTask steps
//! auto-complete without user commands. The driver submits through the same
//! per-experiment serialization unit as user commands, so tick-originated and
//! user-originated mutations never race.
//!
//! The engine itself carries no clock: `tick(now)` is an explicit entry point
//! and this driver is just one way to call it. A timer thread, cooperative
//! event loop, or external cron would do equally well.

use super::actor::Engine;
use super::sink::EventSink;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Drives [`Engine::tick`] on a fixed poll interval.
///
/// # Lifecycle
/// 1. Create: `TickDriver::new(engine)`
/// 2. Configure: `.with_poll_interval(duration)`
/// 3. Start: `.start()` returns a handle
/// 4. Shutdown: `handle.shutdown().await`
///
/// # Example
/// ```ignore
/// let driver = TickDriver::new(Arc::clone(&engine))
///     .with_poll_interval(Duration::from_secs(1))
///     .start();
///
/// // ... experiments run ...
///
/// driver.shutdown().await;
/// ```
pub struct TickDriver<S: EventSink + 'static> {
    engine: Arc<Engine<S>>,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl<S: EventSink + 'static> TickDriver<S> {
    /// Creates a driver with the default 1-second poll interval, giving
    /// auto-completion a precision of about one second.
    pub fn new(engine: Arc<Engine<S>>) -> Self {
        Self {
            engine,
            poll_interval: Duration::from_secs(1),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the poll interval. Lower intervals tighten auto-completion
    /// latency at the cost of more frequent scans.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Starts the driver in a background task.
    ///
    /// The returned handle must be used to stop the driver; dropping it
    /// without calling shutdown leaks the background task.
    pub fn start(self) -> TickDriverHandle {
        let shutdown = Arc::clone(&self.shutdown);

        let handle = tokio::spawn(async move {
            self.run().await;
        });

        TickDriverHandle { handle, shutdown }
    }

    async fn run(self) {
        info!(poll_interval = ?self.poll_interval, "tick driver started");

        while !self.shutdown.load(Ordering::SeqCst) {
            let events = self.engine.tick(Utc::now()).await;
            if !events.is_empty() {
                debug!(events = events.len(), "tick produced auto-completions");
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        info!("tick driver stopped cleanly");
    }
}

/// Handle for stopping the tick driver.
pub struct TickDriverHandle {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

impl TickDriverHandle {
    /// Signals the driver to stop and waits for the in-flight tick, if any,
    /// to finish.
    pub async fn shutdown(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.handle.await;
    }
}
