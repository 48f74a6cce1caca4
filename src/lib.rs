//! # Framekeeper
//!
//! Frame-budget monitoring and priority-based admission control for
//! animations.
//!
//! ## Architecture
//!
//! - `monitor`: rolling frame-time sampling driven by a [`FrameTicker`]
//! - `priority`: admission control for concurrently running animations
//! - `gpu`: one-time device probing and compositor layer hints
//! - `overlay`: text panel showing the latest metrics during development
//! - `runtime`: one instance of each component, wired from configuration
//! - `config`: configuration parsing and management
//! - `element`: the style handle animations act on
//!
//! ## Usage
//!
//! ```rust,no_run
//! use framekeeper::{AnimationEntry, AnimationPriority, AnimationRuntime, FramekeeperConfig};
//! use framekeeper::gpu::SystemCapabilityProvider;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = FramekeeperConfig::default();
//!     let mut runtime = AnimationRuntime::with_interval(config, SystemCapabilityProvider::new());
//!     runtime.init();
//!
//!     let priorities = runtime.priorities_mut();
//!     priorities.register_animation(AnimationEntry::new("toast", AnimationPriority::High));
//!     if priorities.request_animation("toast") {
//!         // play it, then
//!         priorities.release_animation("toast");
//!     }
//!
//!     runtime.dispose();
//! }
//! ```

pub mod config;
pub mod element;
pub mod gpu;
pub mod monitor;
pub mod overlay;
pub mod priority;
pub mod runtime;

// Re-export main types for easy access
pub use config::FramekeeperConfig;
pub use element::{ElementHandle, StyleMap};
pub use gpu::{AnimationKind, CapabilityProvider, DeviceCapabilities, GpuHintManager};
pub use monitor::{
    FrameTicker, IntervalTicker, ManualTicker, MetricsSource, PerformanceMetrics,
    PerformanceMonitor, Subscription,
};
pub use overlay::DebugOverlay;
pub use priority::{AnimationEntry, AnimationPriority, PriorityManager};
pub use runtime::AnimationRuntime;

/// Version information for Framekeeper
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
