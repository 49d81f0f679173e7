//! Single-slot periodic task used for the lockout countdown.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

struct ActiveTick {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Holds at most one running countdown task.
///
/// Arming a new task aborts the previous one. Every arm or cancel bumps the
/// generation, and the tick callback receives the generation it was armed
/// with so it can ignore a late tick from a superseded task.
pub(crate) struct CountdownTicker {
    runtime: Option<tokio::runtime::Handle>,
    period: Duration,
    active: Mutex<Option<ActiveTick>>,
    generation: AtomicU64,
}

impl CountdownTicker {
    /// Capture the current Tokio runtime, if any. Without one, arming is a
    /// logged no-op and countdowns never advance.
    pub(crate) fn new(period: Duration) -> Self {
        Self::with_runtime(tokio::runtime::Handle::try_current().ok(), period)
    }

    pub(crate) fn with_runtime(runtime: Option<tokio::runtime::Handle>, period: Duration) -> Self {
        Self {
            runtime,
            period: period.max(Duration::from_millis(1)),
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace any running task with one that calls `on_tick(generation)`
    /// every period until it returns `false`.
    pub(crate) fn arm<F>(&self, mut on_tick: F) -> Option<u64>
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.handle.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(runtime) = self.runtime.as_ref() else {
            warn!("No async runtime available, lockout countdown will not advance");
            return None;
        };

        let period = self.period;
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick(generation) {
                    break;
                }
            }
            debug!(generation, "Countdown task finished");
        });

        *active = Some(ActiveTick { generation, handle });
        Some(generation)
    }

    /// Abort the running task. Returns whether one was running.
    pub(crate) fn cancel(&self) -> bool {
        let mut active = self.active.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        match active.take() {
            Some(tick) => {
                let running = !tick.handle.is_finished();
                tick.handle.abort();
                debug!(generation = tick.generation, "Countdown task cancelled");
                running
            }
            None => false,
        }
    }

    /// Whether `generation` belongs to the most recent arm.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|tick| !tick.handle.is_finished())
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        if let Some(tick) = self.active.get_mut().take() {
            tick.handle.abort();
        }
    }
}
