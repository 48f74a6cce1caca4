//! Animation runtime
//!
//! Owns one performance monitor, one priority manager and one GPU hint
//! manager, wired together from a [`FramekeeperConfig`]. Hosts create one
//! runtime per rendering surface and pass it to whatever needs it.

use log::info;
use std::sync::Arc;

use crate::config::FramekeeperConfig;
use crate::gpu::{CapabilityProvider, GpuHintManager};
use crate::monitor::{FrameTicker, IntervalTicker, PerformanceMonitor};
use crate::priority::PriorityManager;

pub struct AnimationRuntime {
    config: FramekeeperConfig,
    monitor: Arc<PerformanceMonitor>,
    priorities: PriorityManager,
    gpu: GpuHintManager,
    running: bool,
}

impl AnimationRuntime {
    /// Build the components. The host is probed here because the admission
    /// ceiling depends on the device class.
    pub fn new(
        config: FramekeeperConfig,
        ticker: impl FrameTicker + 'static,
        provider: impl CapabilityProvider + 'static,
    ) -> Self {
        let gpu = GpuHintManager::new(config.gpu.clone(), provider);
        let monitor = Arc::new(PerformanceMonitor::new(config.monitor.clone(), ticker));
        let priorities = PriorityManager::for_device(
            monitor.clone(),
            gpu.capabilities(),
            &config.priority,
        );

        Self {
            config,
            monitor,
            priorities,
            gpu,
            running: false,
        }
    }

    /// Runtime on an [`IntervalTicker`] at the configured tick interval
    pub fn with_interval(
        config: FramekeeperConfig,
        provider: impl CapabilityProvider + 'static,
    ) -> Self {
        let ticker = IntervalTicker::from_millis(config.monitor.tick_interval_ms);
        Self::new(config, ticker, provider)
    }

    /// Start monitoring when enabled. No-op when already running.
    pub fn init(&mut self) {
        if self.running {
            return;
        }

        self.gpu.init();
        if self.config.monitor.enabled {
            self.monitor.start_monitoring();
        }
        self.running = true;

        info!(
            "✅ Animation runtime ready: {} concurrent animations, GPU hints {}",
            self.priorities.max_concurrent(),
            if self.gpu.should_use_gpu_acceleration() {
                "on"
            } else {
                "off"
            }
        );
    }

    /// Stop monitoring. Safe to call more than once.
    pub fn dispose(&mut self) {
        if !self.running {
            return;
        }

        self.monitor.stop_monitoring();
        self.running = false;
        info!("🛑 Animation runtime disposed");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &FramekeeperConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn priorities(&self) -> &PriorityManager {
        &self.priorities
    }

    pub fn priorities_mut(&mut self) -> &mut PriorityManager {
        &mut self.priorities
    }

    pub fn gpu(&self) -> &GpuHintManager {
        &self.gpu
    }
}

impl Drop for AnimationRuntime {
    fn drop(&mut self) {
        self.dispose();
    }
}
