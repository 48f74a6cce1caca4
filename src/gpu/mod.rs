//! GPU acceleration hints
//!
//! Probes the host once, classifies it, and applies compositor layer hints
//! (`will-change`, a 3D transform, hidden backfaces) to animated elements
//! when the device can take advantage of them.

pub mod provider;

use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

pub use provider::{
    CapabilityProvider, HostProbe, ProbeError, StaticCapabilityProvider, SystemCapabilityProvider,
};

use crate::config::GpuConfig;
use crate::element::{ElementHandle, BACKFACE_VISIBILITY, TRANSFORM, WILL_CHANGE};

/// What an animation changes on its element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    Transform,
    Opacity,
    Filter,
    Layout,
}

impl AnimationKind {
    /// `will-change` value announcing this kind of animation
    pub fn will_change(self) -> &'static str {
        match self {
            AnimationKind::Transform => "transform",
            AnimationKind::Opacity => "opacity",
            AnimationKind::Filter => "filter",
            AnimationKind::Layout => "contents",
        }
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnimationKind::Transform => "transform",
            AnimationKind::Opacity => "opacity",
            AnimationKind::Filter => "filter",
            AnimationKind::Layout => "layout",
        };
        f.write_str(name)
    }
}

/// Device class derived from a host probe. Computed once per manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceCapabilities {
    pub supports_gpu: bool,
    pub supports_will_change: bool,
    pub supports_transform3d: bool,
    pub memory_limit_gb: f64,
    pub logical_cores: Option<usize>,
    pub is_low_end: bool,
}

impl DeviceCapabilities {
    /// Classify a probe against the configured low-end thresholds.
    /// Layer hints are only worth applying when a hardware adapter exists.
    pub fn from_probe(probe: &HostProbe, config: &GpuConfig) -> Self {
        let supports_gpu = probe.gpu_adapter.is_some() && !config.force_disable;
        let memory_limit_gb = probe.memory_gb.unwrap_or(config.default_memory_gb);
        let few_cores = probe
            .logical_cores
            .map(|cores| cores < config.low_end_cores)
            .unwrap_or(false);

        Self {
            supports_gpu,
            supports_will_change: supports_gpu,
            supports_transform3d: supports_gpu,
            memory_limit_gb,
            logical_cores: probe.logical_cores,
            is_low_end: memory_limit_gb < config.low_end_memory_gb || few_cores,
        }
    }

    /// No GPU, `memory_gb` of memory, unknown cores
    pub fn fallback(memory_gb: f64, config: &GpuConfig) -> Self {
        let probe = HostProbe {
            gpu_adapter: None,
            memory_gb: Some(memory_gb),
            logical_cores: None,
        };
        Self::from_probe(&probe, config)
    }
}

/// Decides whether and how to hint elements for GPU compositing.
pub struct GpuHintManager {
    config: GpuConfig,
    provider: Box<dyn CapabilityProvider>,
    capabilities: OnceLock<DeviceCapabilities>,
}

impl GpuHintManager {
    pub fn new(config: GpuConfig, provider: impl CapabilityProvider + 'static) -> Self {
        Self::with_provider(config, Box::new(provider))
    }

    pub fn with_provider(config: GpuConfig, provider: Box<dyn CapabilityProvider>) -> Self {
        Self {
            config,
            provider,
            capabilities: OnceLock::new(),
        }
    }

    /// Probe the host and cache the result. Later calls are no-ops.
    pub fn init(&self) {
        self.capabilities();
    }

    pub fn is_initialized(&self) -> bool {
        self.capabilities.get().is_some()
    }

    /// Cached capabilities, probing on first use
    pub fn capabilities(&self) -> &DeviceCapabilities {
        self.capabilities.get_or_init(|| {
            let capabilities = match self.provider.probe() {
                Ok(probe) => DeviceCapabilities::from_probe(&probe, &self.config),
                Err(e) => {
                    warn!("⚠️ Capability probe failed, assuming no GPU: {}", e);
                    DeviceCapabilities::from_probe(&HostProbe::default(), &self.config)
                }
            };

            info!(
                "🎮 Device capabilities: gpu={}, memory={:.1} GB, cores={:?}, low-end={}",
                capabilities.supports_gpu,
                capabilities.memory_limit_gb,
                capabilities.logical_cores,
                capabilities.is_low_end
            );
            capabilities
        })
    }

    pub fn should_use_gpu_acceleration(&self) -> bool {
        let capabilities = self.capabilities();
        capabilities.supports_gpu && !capabilities.is_low_end
    }

    /// Style properties that animate cheaply on this device
    pub fn optimal_animation_properties(&self) -> Vec<&'static str> {
        let mut properties = vec!["transform", "opacity"];
        if self.capabilities().supports_gpu {
            properties.push("filter");
        }
        properties
    }

    /// Apply layer promotion hints for an upcoming `kind` animation.
    pub fn optimize_element(&self, element: &dyn ElementHandle, kind: AnimationKind) {
        let capabilities = self.capabilities();

        if capabilities.supports_will_change {
            element.set_style(WILL_CHANGE, kind.will_change());
        }

        if capabilities.supports_transform3d {
            if element.style(TRANSFORM).is_none() {
                element.set_style(TRANSFORM, "translateZ(0)");
            }
            element.set_style(BACKFACE_VISIBILITY, "hidden");
        }

        debug!("🎮 Optimized element for {} animation", kind);
    }

    /// Drop the `will-change` hint once the animation is over.
    pub fn cleanup_element(&self, element: &dyn ElementHandle) {
        element.set_style(WILL_CHANGE, "auto");
    }
}
