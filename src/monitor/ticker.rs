//! Frame tickers
//!
//! A ticker drives the performance monitor once per frame. It replaces an
//! ambient "call me on the next paint" primitive with an object that is
//! explicitly started and stopped by its owner.
//!
//! - [`IntervalTicker`]: tokio task firing at a fixed frame period
//! - [`ManualTicker`]: host-driven time, for custom frame loops and tests

use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const DEFAULT_PERIOD_MS: f64 = 16.67;

/// Callback invoked with the frame timestamp in milliseconds
pub type FrameCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Source of per-frame callbacks.
pub trait FrameTicker: Send + Sync {
    /// Current time on this ticker's clock (ms)
    fn now_ms(&self) -> f64;

    /// Begin calling `on_frame` once per frame, replacing any previous callback
    fn start(&self, on_frame: FrameCallback);

    /// Stop calling back. No-op when already stopped.
    fn stop(&self);

    fn is_running(&self) -> bool;
}

/// Fixed-period ticker backed by a tokio task.
///
/// Without a tokio runtime on the calling thread the ticker stays idle and
/// never calls back; the monitor then simply reports no samples.
pub struct IntervalTicker {
    period: Duration,
    origin: Instant,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_micros(100)),
            origin: Instant::now(),
            task: Mutex::new(None),
        }
    }

    /// Ticker firing every `period_ms` milliseconds.
    /// A period that is not a representable duration falls back to 60 Hz.
    pub fn from_millis(period_ms: f64) -> Self {
        let period = match Duration::try_from_secs_f64(period_ms.max(0.0) / 1000.0) {
            Ok(period) => period,
            Err(e) => {
                warn!(
                    "⏱️ Invalid ticker period {}ms ({}), using {}ms",
                    period_ms, e, DEFAULT_PERIOD_MS
                );
                Duration::from_secs_f64(DEFAULT_PERIOD_MS / 1000.0)
            }
        };
        Self::new(period)
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl FrameTicker for IntervalTicker {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn start(&self, on_frame: FrameCallback) {
        self.stop();

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("⏱️ No tokio runtime available, frame ticker stays idle");
                return;
            }
        };

        let period = self.period;
        let origin = self.origin;
        let task = handle.spawn(async move {
            let first = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                on_frame(origin.elapsed().as_secs_f64() * 1000.0);
            }
        });

        debug!("⏱️ Interval ticker started ({:?} period)", period);
        *self.task.lock() = Some(task);
    }

    fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!("⏱️ Interval ticker stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ticker whose clock only moves when the host says so.
///
/// Clones share the same clock and callback, so a host can hand one clone to
/// the monitor and keep another to drive frames.
#[derive(Clone, Default)]
pub struct ManualTicker {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    now_ms: f64,
    callback: Option<FrameCallback>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `ms` and deliver one frame.
    /// Returns false when the ticker is stopped.
    pub fn advance(&self, ms: f64) -> bool {
        let now = self.inner.lock().now_ms + ms;
        self.tick_at(now)
    }

    /// Set the clock to `now_ms` and deliver one frame.
    pub fn tick_at(&self, now_ms: f64) -> bool {
        let callback = {
            let mut state = self.inner.lock();
            state.now_ms = now_ms;
            state.callback.clone()
        };

        match callback {
            Some(callback) => {
                callback(now_ms);
                true
            }
            None => false,
        }
    }

    /// Deliver `count` frames of `frame_ms` each.
    pub fn run_frames(&self, count: usize, frame_ms: f64) {
        for _ in 0..count {
            self.advance(frame_ms);
        }
    }
}

impl FrameTicker for ManualTicker {
    fn now_ms(&self) -> f64 {
        self.inner.lock().now_ms
    }

    fn start(&self, on_frame: FrameCallback) {
        self.inner.lock().callback = Some(on_frame);
    }

    fn stop(&self) {
        self.inner.lock().callback = None;
    }

    fn is_running(&self) -> bool {
        self.inner.lock().callback.is_some()
    }
}
