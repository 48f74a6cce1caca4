//! Development metrics overlay
//!
//! A small text panel fed by the monitor's periodic snapshots. Hosts draw
//! the lines returned by [`DebugOverlay::render`] wherever suits them.

use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::OverlayConfig;
use crate::monitor::{PerformanceMetrics, PerformanceMonitor, Subscription};

pub struct DebugOverlay {
    latest: Arc<Mutex<PerformanceMetrics>>,
    visible: AtomicBool,
    toggle_key: String,
    subscription: Option<Subscription>,
}

impl DebugOverlay {
    /// Subscribe to `monitor` and start from its current metrics
    pub fn attach(monitor: &PerformanceMonitor, config: &OverlayConfig) -> Self {
        let latest = Arc::new(Mutex::new(monitor.metrics()));

        let sink = Arc::clone(&latest);
        let subscription = monitor.subscribe(move |metrics| {
            *sink.lock() = *metrics;
        });

        Self {
            latest,
            visible: AtomicBool::new(config.enabled),
            toggle_key: config.toggle_key.clone(),
            subscription: Some(subscription),
        }
    }

    /// Flip visibility, returning the new state
    pub fn toggle(&self) -> bool {
        let visible = !self.visible.fetch_xor(true, Ordering::SeqCst);
        debug!("📈 Overlay {}", if visible { "shown" } else { "hidden" });
        visible
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Key chord the host should bind to [`DebugOverlay::toggle`]
    pub fn toggle_key(&self) -> &str {
        &self.toggle_key
    }

    /// Most recent snapshot received
    pub fn latest(&self) -> PerformanceMetrics {
        *self.latest.lock()
    }

    /// Panel lines, empty while hidden
    pub fn render(&self) -> Vec<String> {
        if !self.is_visible() {
            return Vec::new();
        }

        let metrics = self.latest();
        let drop_percent = metrics.drop_ratio() * 100.0;
        vec![
            format!(
                "FPS: {} (avg {})",
                number(metrics.fps, 1),
                number(metrics.average_fps, 1)
            ),
            format!("Frame time: {} ms", number(metrics.frame_time, 2)),
            format!(
                "Dropped: {} / {} ({}%)",
                metrics.dropped_frames,
                metrics.total_frames,
                number(drop_percent, 1)
            ),
            format!("Status: {}", status(&metrics)),
        ]
    }

    /// Stop receiving snapshots. The last one stays displayed.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }
}

impl Drop for DebugOverlay {
    fn drop(&mut self) {
        self.detach();
    }
}

/// One-line summary of a snapshot
pub fn format_metrics(metrics: &PerformanceMetrics) -> String {
    format!(
        "{} fps (avg {}), {} ms/frame, {}/{} dropped, {}",
        number(metrics.fps, 1),
        number(metrics.average_fps, 1),
        number(metrics.frame_time, 2),
        metrics.dropped_frames,
        metrics.total_frames,
        status(metrics)
    )
}

fn number(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", precision, value)
    } else {
        "--".to_string()
    }
}

fn status(metrics: &PerformanceMetrics) -> &'static str {
    if !metrics.has_samples() {
        "waiting"
    } else if metrics.is_performant {
        "smooth"
    } else {
        "janky"
    }
}
