//! Frame-rate monitoring
//!
//! The [`PerformanceMonitor`] samples one frame per ticker callback, keeps a
//! rolling window of recent frame times and derives FPS and drop-rate
//! metrics from it. Subscribers receive a fresh snapshot every
//! `notify_every` sampled frames.
//!
//! # Usage
//!
//! ```no_run
//! use framekeeper::config::MonitorConfig;
//! use framekeeper::monitor::PerformanceMonitor;
//!
//! # async fn run() {
//! let monitor = PerformanceMonitor::with_interval(MonitorConfig::default());
//! let subscription = monitor.subscribe(|metrics| {
//!     println!("{:.1} fps", metrics.average_fps);
//! });
//!
//! monitor.start_monitoring();
//! tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//! monitor.stop_monitoring();
//! subscription.unsubscribe();
//! # }
//! ```

pub mod ticker;

use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

pub use ticker::{FrameCallback, FrameTicker, IntervalTicker, ManualTicker};

use crate::config::MonitorConfig;

/// Snapshot of the monitor's derived metrics.
///
/// Before the first sampled frame `fps`, `frame_time` and `average_fps` are
/// NaN and `is_performant` is false.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Instantaneous FPS from the last frame
    pub fps: f64,
    /// Rolling average frame duration (ms)
    pub frame_time: f64,
    /// Frames over budget since monitoring started
    pub dropped_frames: u64,
    /// Frames observed since monitoring started
    pub total_frames: u64,
    /// FPS derived from the rolling average
    pub average_fps: f64,
    pub is_performant: bool,
}

impl PerformanceMetrics {
    /// Metrics of a monitor that has not sampled anything
    pub fn empty() -> Self {
        Self {
            fps: f64::NAN,
            frame_time: f64::NAN,
            dropped_frames: 0,
            total_frames: 0,
            average_fps: f64::NAN,
            is_performant: false,
        }
    }

    pub fn has_samples(&self) -> bool {
        self.total_frames > 0
    }

    /// Dropped / total frames, NaN without samples
    pub fn drop_ratio(&self) -> f64 {
        if self.total_frames == 0 {
            return f64::NAN;
        }
        self.dropped_frames as f64 / self.total_frames as f64
    }
}

/// Anything that can report current frame metrics.
pub trait MetricsSource: Send + Sync {
    fn metrics(&self) -> PerformanceMetrics;
}

type Subscriber = Arc<dyn Fn(&PerformanceMetrics) + Send + Sync>;

#[derive(Default)]
struct MonitorState {
    monitoring: bool,
    /// Bumped on every start so callbacks from an earlier run are ignored
    generation: u64,
    last_time: f64,
    history: VecDeque<f64>,
    total_frames: u64,
    dropped_frames: u64,
}

impl MonitorState {
    fn reset(&mut self, now_ms: f64) {
        self.last_time = now_ms;
        self.history.clear();
        self.total_frames = 0;
        self.dropped_frames = 0;
    }

    fn metrics(&self, config: &MonitorConfig) -> PerformanceMetrics {
        let (fps, frame_time) = match self.history.back() {
            Some(last) => {
                let sum: f64 = self.history.iter().sum();
                (1000.0 / last, sum / self.history.len() as f64)
            }
            None => (f64::NAN, f64::NAN),
        };

        let mut metrics = PerformanceMetrics {
            fps,
            frame_time,
            dropped_frames: self.dropped_frames,
            total_frames: self.total_frames,
            average_fps: 1000.0 / frame_time,
            is_performant: false,
        };
        metrics.is_performant = metrics.average_fps >= config.min_average_fps
            && metrics.drop_ratio() < config.max_drop_ratio;
        metrics
    }
}

struct Shared {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
    subscribers: Mutex<Vec<(u64, Subscriber)>>,
    next_subscriber: Mutex<u64>,
}

impl Shared {
    fn record_frame(&self, generation: Option<u64>, now_ms: f64) {
        let snapshot = {
            let mut state = self.state.lock();
            if !state.monitoring {
                return;
            }
            if generation.is_some_and(|g| g != state.generation) {
                return;
            }

            let frame_time = (now_ms - state.last_time).max(0.0);
            state.last_time = now_ms;

            state.history.push_back(frame_time);
            while state.history.len() > self.config.history_size {
                state.history.pop_front();
            }

            state.total_frames += 1;
            if frame_time > self.config.frame_budget_ms {
                state.dropped_frames += 1;
            }

            if state.total_frames % self.config.notify_every == 0 {
                Some(state.metrics(&self.config))
            } else {
                None
            }
        };

        if let Some(metrics) = snapshot {
            self.notify(&metrics);
        }
    }

    fn notify(&self, metrics: &PerformanceMetrics) {
        // Listeners run unlocked so they may call back into the monitor
        let listeners: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(metrics);
        }
    }
}

/// Rolling frame-time monitor.
pub struct PerformanceMonitor {
    shared: Arc<Shared>,
    ticker: Box<dyn FrameTicker>,
}

impl PerformanceMonitor {
    /// Create a monitor driven by `ticker`
    pub fn new(config: MonitorConfig, ticker: impl FrameTicker + 'static) -> Self {
        Self::with_ticker(config, Box::new(ticker))
    }

    pub fn with_ticker(config: MonitorConfig, ticker: Box<dyn FrameTicker>) -> Self {
        info!(
            "📊 Performance monitor: {} frame window, {:.2}ms budget, notify every {} frames",
            config.history_size, config.frame_budget_ms, config.notify_every
        );

        Self {
            shared: Arc::new(Shared {
                config: MonitorConfig {
                    history_size: config.history_size.max(1),
                    notify_every: config.notify_every.max(1),
                    ..config
                },
                state: Mutex::new(MonitorState::default()),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber: Mutex::new(0),
            }),
            ticker,
        }
    }

    /// Create a monitor on a tokio [`IntervalTicker`] at `tick_interval_ms`
    pub fn with_interval(config: MonitorConfig) -> Self {
        let ticker = IntervalTicker::from_millis(config.tick_interval_ms);
        Self::new(config, ticker)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// Reset all counters and begin sampling. No-op while already monitoring.
    pub fn start_monitoring(&self) {
        let generation = {
            let mut state = self.shared.state.lock();
            if state.monitoring {
                return;
            }
            state.reset(self.ticker.now_ms());
            state.monitoring = true;
            state.generation += 1;
            state.generation
        };

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        self.ticker.start(Arc::new(move |now_ms| {
            if let Some(shared) = shared.upgrade() {
                shared.record_frame(Some(generation), now_ms);
            }
        }));

        debug!("📊 Monitoring started (run {})", generation);
    }

    /// Stop sampling. Metrics stay frozen at their last values.
    pub fn stop_monitoring(&self) {
        {
            let mut state = self.shared.state.lock();
            if !state.monitoring {
                return;
            }
            state.monitoring = false;
        }
        self.ticker.stop();

        debug!("📊 Monitoring stopped");
    }

    pub fn is_monitoring(&self) -> bool {
        self.shared.state.lock().monitoring
    }

    /// Sample one frame at `now_ms` on the ticker's clock.
    ///
    /// For hosts that run their own frame loop; ignored while not monitoring.
    pub fn record_frame(&self, now_ms: f64) {
        self.shared.record_frame(None, now_ms);
    }

    /// Snapshot of the current metrics
    pub fn metrics(&self) -> PerformanceMetrics {
        self.shared.state.lock().metrics(&self.shared.config)
    }

    /// Register a listener called with fresh metrics every `notify_every` frames
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PerformanceMetrics) + Send + Sync + 'static,
    {
        let id = {
            let mut next = self.shared.next_subscriber.lock();
            *next += 1;
            *next
        };
        self.shared
            .subscribers
            .lock()
            .push((id, Arc::new(listener)));

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }
}

impl MetricsSource for PerformanceMonitor {
    fn metrics(&self) -> PerformanceMetrics {
        PerformanceMonitor::metrics(self)
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        self.ticker.stop();
    }
}

/// Handle returned by [`PerformanceMonitor::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Remove this listener. Other listeners are unaffected.
    pub fn unsubscribe(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manual_monitor() -> (PerformanceMonitor, ManualTicker) {
        let ticker = ManualTicker::new();
        let monitor = PerformanceMonitor::new(MonitorConfig::default(), ticker.clone());
        (monitor, ticker)
    }

    #[test]
    fn test_metrics_before_any_frame() {
        let (monitor, _ticker) = manual_monitor();

        let metrics = monitor.metrics();
        assert_eq!(metrics.total_frames, 0);
        assert!(metrics.frame_time.is_nan());
        assert!(metrics.average_fps.is_nan());
        assert!(!metrics.is_performant);
        assert!(!metrics.has_samples());
    }

    #[test]
    fn test_steady_60fps_is_performant() {
        let (monitor, ticker) = manual_monitor();
        monitor.start_monitoring();

        ticker.run_frames(30, 16.0);

        let metrics = monitor.metrics();
        assert_eq!(metrics.total_frames, 30);
        assert_eq!(metrics.dropped_frames, 0);
        assert!((metrics.frame_time - 16.0).abs() < 1e-9);
        assert!((metrics.fps - 62.5).abs() < 1e-9);
        assert!((metrics.average_fps - 62.5).abs() < 1e-9);
        assert!(metrics.is_performant);
    }

    #[test]
    fn test_frames_over_budget_count_as_dropped() {
        let (monitor, ticker) = manual_monitor();
        monitor.start_monitoring();

        ticker.run_frames(8, 16.0);
        ticker.run_frames(2, 33.0);

        let metrics = monitor.metrics();
        assert_eq!(metrics.total_frames, 10);
        assert_eq!(metrics.dropped_frames, 2);
        // 20% dropped is over the 10% threshold
        assert!(!metrics.is_performant);
    }

    #[test]
    fn test_exactly_on_budget_is_not_dropped() {
        let (monitor, ticker) = manual_monitor();
        monitor.start_monitoring();

        ticker.advance(16.67);

        assert_eq!(monitor.metrics().dropped_frames, 0);
    }

    #[test]
    fn test_history_window_keeps_newest_samples() {
        let (monitor, ticker) = manual_monitor();
        monitor.start_monitoring();

        ticker.run_frames(60, 40.0);
        ticker.run_frames(60, 10.0);

        let metrics = monitor.metrics();
        assert_eq!(metrics.total_frames, 120);
        assert_eq!(metrics.dropped_frames, 60);
        assert!((metrics.frame_time - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_slow_average_is_not_performant() {
        // 50 fps without a single dropped frame is still under the 55 fps floor
        let ticker = ManualTicker::new();
        let config = MonitorConfig {
            frame_budget_ms: 25.0,
            ..MonitorConfig::default()
        };
        let monitor = PerformanceMonitor::new(config, ticker.clone());
        monitor.start_monitoring();

        ticker.run_frames(20, 20.0);

        let metrics = monitor.metrics();
        assert_eq!(metrics.dropped_frames, 0);
        assert!(!metrics.is_performant);
    }

    #[test]
    fn test_infinite_tick_interval_does_not_panic() {
        let monitor = PerformanceMonitor::with_interval(MonitorConfig {
            tick_interval_ms: f64::INFINITY,
            ..MonitorConfig::default()
        });

        monitor.start_monitoring();
        assert!(monitor.is_monitoring());
        monitor.stop_monitoring();
    }

    #[test]
    fn test_one_dropped_frame_in_ten_is_not_performant() {
        // 10% dropped sits exactly on the threshold, which is exclusive
        let (monitor, ticker) = manual_monitor();
        monitor.start_monitoring();

        ticker.run_frames(9, 16.0);
        ticker.advance(17.0);

        let metrics = monitor.metrics();
        assert_eq!(metrics.total_frames, 10);
        assert_eq!(metrics.dropped_frames, 1);
        assert_eq!(metrics.drop_ratio(), 0.10);
        assert!(metrics.average_fps >= 55.0);
        assert!(!metrics.is_performant);
    }

    #[test]
    fn test_start_is_idempotent_and_restart_resets() {
        let (monitor, ticker) = manual_monitor();
        monitor.start_monitoring();
        ticker.run_frames(5, 16.0);

        monitor.start_monitoring();
        assert_eq!(monitor.metrics().total_frames, 5);

        monitor.stop_monitoring();
        monitor.stop_monitoring();
        monitor.start_monitoring();
        assert_eq!(monitor.metrics().total_frames, 0);

        // The first frame after a restart is measured from the restart
        ticker.advance(16.0);
        assert!((monitor.metrics().frame_time - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_frozen_while_stopped() {
        let (monitor, ticker) = manual_monitor();
        monitor.start_monitoring();
        ticker.run_frames(5, 16.0);
        monitor.stop_monitoring();

        ticker.run_frames(5, 16.0);
        monitor.record_frame(1_000.0);

        assert_eq!(monitor.metrics().total_frames, 5);
        assert!(!monitor.is_monitoring());
    }

    /// Keeps every callback it was ever handed, like a ticker that fails to cancel
    #[derive(Clone, Default)]
    struct LeakyTicker {
        callbacks: Arc<Mutex<Vec<FrameCallback>>>,
    }

    impl FrameTicker for LeakyTicker {
        fn now_ms(&self) -> f64 {
            0.0
        }

        fn start(&self, on_frame: FrameCallback) {
            self.callbacks.lock().push(on_frame);
        }

        fn stop(&self) {}

        fn is_running(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_stale_ticks_from_previous_run_are_ignored() {
        let ticker = LeakyTicker::default();
        let monitor = PerformanceMonitor::new(MonitorConfig::default(), ticker.clone());

        monitor.start_monitoring();
        monitor.stop_monitoring();
        monitor.start_monitoring();

        let callbacks = ticker.callbacks.lock().clone();
        assert_eq!(callbacks.len(), 2);

        callbacks[0](16.0);
        assert_eq!(monitor.metrics().total_frames, 0);

        callbacks[1](16.0);
        assert_eq!(monitor.metrics().total_frames, 1);
    }

    #[test]
    fn test_subscribers_notified_every_ten_frames() {
        let (monitor, ticker) = manual_monitor();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&calls);
        let _subscription = monitor.subscribe(move |metrics| {
            sink.lock().push(metrics.total_frames);
        });

        monitor.start_monitoring();
        ticker.run_frames(25, 16.0);

        assert_eq!(*calls.lock(), vec![10, 20]);
    }

    #[test]
    fn test_unsubscribe_leaves_other_subscribers() {
        let (monitor, ticker) = manual_monitor();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        let first_sub = monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&second);
        let _second_sub = monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        monitor.start_monitoring();
        ticker.run_frames(10, 16.0);

        first_sub.unsubscribe();
        first_sub.unsubscribe();
        ticker.run_frames(10, 16.0);

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(monitor.subscriber_count(), 1);
    }

    #[test]
    fn test_subscriber_can_read_monitor_reentrantly() {
        let ticker = ManualTicker::new();
        let monitor = Arc::new(PerformanceMonitor::new(
            MonitorConfig::default(),
            ticker.clone(),
        ));
        let seen = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&monitor);
        let counter = Arc::clone(&seen);
        let _subscription = monitor.subscribe(move |_| {
            if let Some(monitor) = weak.upgrade() {
                counter.store(monitor.metrics().total_frames as usize, Ordering::SeqCst);
            }
        });

        monitor.start_monitoring();
        ticker.run_frames(10, 16.0);

        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_host_driven_frames() {
        let (monitor, ticker) = manual_monitor();
        ticker.tick_at(100.0);
        monitor.start_monitoring();

        monitor.record_frame(116.0);
        monitor.record_frame(150.0);

        let metrics = monitor.metrics();
        assert_eq!(metrics.total_frames, 2);
        assert_eq!(metrics.dropped_frames, 1);
        assert!((metrics.fps - 1000.0 / 34.0).abs() < 1e-9);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Step {
            Frame(f64),
            Start,
            Stop,
        }

        fn step() -> impl Strategy<Value = Step> {
            prop_oneof![
                8 => (0.0f64..100.0).prop_map(Step::Frame),
                1 => Just(Step::Start),
                1 => Just(Step::Stop),
            ]
        }

        proptest! {
            #[test]
            fn test_counters_stay_consistent(steps in prop::collection::vec(step(), 1..200)) {
                let (monitor, ticker) = manual_monitor();
                for step in steps {
                    let before = monitor.metrics();
                    let was_monitoring = monitor.is_monitoring();

                    match step {
                        Step::Frame(ms) => {
                            ticker.advance(ms);
                            let after = monitor.metrics();
                            if was_monitoring {
                                prop_assert_eq!(after.total_frames, before.total_frames + 1);
                                prop_assert!(after.dropped_frames >= before.dropped_frames);
                            } else {
                                prop_assert_eq!(after.total_frames, before.total_frames);
                                prop_assert_eq!(after.dropped_frames, before.dropped_frames);
                            }
                        }
                        Step::Start => {
                            monitor.start_monitoring();
                            let after = monitor.metrics();
                            if was_monitoring {
                                prop_assert_eq!(after.total_frames, before.total_frames);
                            } else {
                                prop_assert_eq!(after.total_frames, 0);
                            }
                        }
                        Step::Stop => {
                            monitor.stop_monitoring();
                            prop_assert_eq!(monitor.metrics().total_frames, before.total_frames);
                        }
                    }

                    let metrics = monitor.metrics();
                    prop_assert!(metrics.dropped_frames <= metrics.total_frames);
                    if metrics.has_samples() {
                        let expected = metrics.average_fps >= 55.0 && metrics.drop_ratio() < 0.10;
                        prop_assert_eq!(metrics.is_performant, expected);
                    } else {
                        prop_assert!(!metrics.is_performant);
                    }
                }
            }
        }
    }
}
