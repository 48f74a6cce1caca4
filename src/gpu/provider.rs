//! Host capability probing
//!
//! A [`CapabilityProvider`] reports raw facts about the host (graphics
//! adapter, memory, cores). Turning those facts into a device class is the
//! hint manager's job.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Raw facts gathered from the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostProbe {
    /// Name of a hardware graphics adapter, if one was found
    pub gpu_adapter: Option<String>,
    /// Total memory in GB, if the platform reports it
    pub memory_gb: Option<f64>,
    /// Logical core count, if the platform reports it
    pub logical_cores: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to spawn probe thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("graphics probe panicked")]
    Panicked,
}

/// Source of host capability facts.
#[cfg_attr(test, mockall::automock)]
pub trait CapabilityProvider: Send + Sync {
    fn probe(&self) -> Result<HostProbe, ProbeError>;
}

/// Queries the real host: wgpu for a hardware adapter, sysinfo for memory
/// and the standard library for core count.
#[derive(Debug, Default)]
pub struct SystemCapabilityProvider;

impl SystemCapabilityProvider {
    pub fn new() -> Self {
        Self
    }

    fn find_gpu_adapter() -> Option<String> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        for power in [
            wgpu::PowerPreference::HighPerformance,
            wgpu::PowerPreference::LowPower,
        ] {
            let adapter = pollster::block_on(instance.request_adapter(
                &wgpu::RequestAdapterOptions {
                    power_preference: power,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                },
            ));

            if let Some(adapter) = adapter {
                let info = adapter.get_info();
                if info.device_type == wgpu::DeviceType::Cpu {
                    debug!("🖥️ Skipping software adapter: {}", info.name);
                    continue;
                }
                return Some(info.name);
            }
        }

        None
    }

    fn total_memory_gb() -> Option<f64> {
        let mut system = sysinfo::System::new();
        system.refresh_memory();

        match system.total_memory() {
            0 => None,
            bytes => Some(bytes as f64 / BYTES_PER_GB),
        }
    }
}

impl CapabilityProvider for SystemCapabilityProvider {
    fn probe(&self) -> Result<HostProbe, ProbeError> {
        // Driver enumeration can block or panic, keep it off the caller's thread
        let gpu_adapter = std::thread::Builder::new()
            .name("gpu-probe".to_string())
            .spawn(Self::find_gpu_adapter)?
            .join()
            .map_err(|_| ProbeError::Panicked)?;

        let probe = HostProbe {
            gpu_adapter,
            memory_gb: Self::total_memory_gb(),
            logical_cores: std::thread::available_parallelism()
                .ok()
                .map(|cores| cores.get()),
        };

        info!(
            "🖥️ Host probe: adapter={:?}, memory={:?} GB, cores={:?}",
            probe.gpu_adapter, probe.memory_gb, probe.logical_cores
        );
        Ok(probe)
    }
}

/// Always reports the same facts. Used for overrides and headless hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilityProvider {
    probe: HostProbe,
}

impl StaticCapabilityProvider {
    pub fn new(probe: HostProbe) -> Self {
        Self { probe }
    }

    /// Hardware adapter, 16 GB, 8 cores
    pub fn capable() -> Self {
        Self::new(HostProbe {
            gpu_adapter: Some("static adapter".to_string()),
            memory_gb: Some(16.0),
            logical_cores: Some(8),
        })
    }

    /// No adapter, 2 GB, 2 cores
    pub fn low_end() -> Self {
        Self::new(HostProbe {
            gpu_adapter: None,
            memory_gb: Some(2.0),
            logical_cores: Some(2),
        })
    }
}

impl CapabilityProvider for StaticCapabilityProvider {
    fn probe(&self) -> Result<HostProbe, ProbeError> {
        Ok(self.probe.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider_reports_fixed_probe() {
        let provider = StaticCapabilityProvider::low_end();
        let probe = provider.probe().unwrap();

        assert_eq!(probe.gpu_adapter, None);
        assert_eq!(probe.memory_gb, Some(2.0));
        assert_eq!(probe.logical_cores, Some(2));
        assert_eq!(provider.probe().unwrap(), probe);
    }

    #[test]
    fn test_probe_error_messages() {
        assert_eq!(ProbeError::Panicked.to_string(), "graphics probe panicked");
        let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads");
        assert!(ProbeError::from(io).to_string().contains("no threads"));
    }
}
