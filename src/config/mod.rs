//! Configuration management for Framekeeper
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files. It combines settings for the performance monitor,
//! the animation priority manager, GPU hinting and the debug overlay.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Main configuration struct containing all Framekeeper settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FramekeeperConfig {
    /// Frame sampling and metrics thresholds
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Animation admission control
    #[serde(default)]
    pub priority: PriorityConfig,

    /// Device capability thresholds and GPU hinting
    #[serde(default)]
    pub gpu: GpuConfig,

    /// Development metrics overlay
    #[serde(default)]
    pub overlay: OverlayConfig,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Performance monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Start monitoring when the runtime initialises
    pub enabled: bool,

    /// Number of recent frame times kept for the rolling average
    pub history_size: usize,

    /// Frame budget (ms); longer frames count as dropped
    pub frame_budget_ms: f64,

    /// Subscribers are notified every this many sampled frames
    pub notify_every: u64,

    /// Minimum rolling-average FPS to be considered performant
    pub min_average_fps: f64,

    /// Dropped/total ratio at or above which performance is degraded
    pub max_drop_ratio: f64,

    /// Period of the interval ticker (ms)
    pub tick_interval_ms: f64,
}

/// Preemption tie-break when several active animations could yield
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PreemptionPolicy {
    /// Lowest priority first, earliest activated among equals
    #[default]
    LowestPriorityFirst,
    /// First lower-priority animation in activation order
    FirstMatch,
}

/// Priority manager configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriorityConfig {
    /// Concurrent animation ceiling on capable devices
    pub max_concurrent: usize,

    /// Concurrent animation ceiling on low-end devices
    pub low_end_max_concurrent: usize,

    /// Which lower-priority animation yields its slot
    pub preemption: PreemptionPolicy,
}

/// Device capability configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GpuConfig {
    /// Assumed device memory (GB) when the platform does not report it
    pub default_memory_gb: f64,

    /// Devices with less memory than this (GB) are low-end
    pub low_end_memory_gb: f64,

    /// Devices with fewer logical cores than this are low-end
    pub low_end_cores: usize,

    /// Never report GPU support, regardless of the probe
    pub force_disable: bool,
}

/// Debug overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    /// Show the overlay on startup
    pub enabled: bool,

    /// Key chord that toggles the overlay
    pub toggle_key: String,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

/// Validation failures for [`FramekeeperConfig`]
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {field}: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("invalid {field}: must be at least 1")]
    Zero { field: &'static str },

    #[error("low_end_max_concurrent ({low_end}) exceeds max_concurrent ({default})")]
    LowEndCeilingTooHigh { low_end: usize, default: usize },
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            history_size: 60,
            frame_budget_ms: 16.67, // 60 FPS target
            notify_every: 10,
            min_average_fps: 55.0,
            max_drop_ratio: 0.10,
            tick_interval_ms: 16.67,
        }
    }
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            low_end_max_concurrent: 3,
            preemption: PreemptionPolicy::default(),
        }
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            default_memory_gb: 4.0,
            low_end_memory_gb: 4.0,
            low_end_cores: 4,
            force_disable: false,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            toggle_key: "Ctrl+Shift+P".to_string(),
        }
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
    expected: &'static str,
) -> std::result::Result<(), ConfigError> {
    if value.is_nan() || value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            expected,
        });
    }
    Ok(())
}

impl FramekeeperConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Path::new(&home).join(path.strip_prefix("~").unwrap_or(path))
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: FramekeeperConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.check().map_err(anyhow::Error::from)
    }

    fn check(&self) -> std::result::Result<(), ConfigError> {
        let monitor = &self.monitor;
        if monitor.history_size == 0 {
            return Err(ConfigError::Zero {
                field: "monitor.history_size",
            });
        }
        if monitor.notify_every == 0 {
            return Err(ConfigError::Zero {
                field: "monitor.notify_every",
            });
        }
        check_range(
            "monitor.frame_budget_ms",
            monitor.frame_budget_ms,
            f64::MIN_POSITIVE,
            1000.0,
            "0 < ms <= 1000",
        )?;
        check_range(
            "monitor.tick_interval_ms",
            monitor.tick_interval_ms,
            f64::MIN_POSITIVE,
            1000.0,
            "0 < ms <= 1000",
        )?;
        check_range(
            "monitor.min_average_fps",
            monitor.min_average_fps,
            f64::MIN_POSITIVE,
            1000.0,
            "0 < fps <= 1000",
        )?;
        check_range(
            "monitor.max_drop_ratio",
            monitor.max_drop_ratio,
            0.0,
            1.0,
            "0.0..=1.0",
        )?;

        let priority = &self.priority;
        if priority.max_concurrent == 0 {
            return Err(ConfigError::Zero {
                field: "priority.max_concurrent",
            });
        }
        if priority.low_end_max_concurrent == 0 {
            return Err(ConfigError::Zero {
                field: "priority.low_end_max_concurrent",
            });
        }
        if priority.low_end_max_concurrent > priority.max_concurrent {
            return Err(ConfigError::LowEndCeilingTooHigh {
                low_end: priority.low_end_max_concurrent,
                default: priority.max_concurrent,
            });
        }

        check_range(
            "gpu.default_memory_gb",
            self.gpu.default_memory_gb,
            f64::MIN_POSITIVE,
            f64::MAX,
            "> 0",
        )?;
        check_range(
            "gpu.low_end_memory_gb",
            self.gpu.low_end_memory_gb,
            0.0,
            f64::MAX,
            ">= 0",
        )?;

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Merge a partial configuration into this one
    /// Sections of the partial config that differ from the defaults override this config
    pub fn merge_partial(mut self, partial: FramekeeperConfig) -> Self {
        let default_config = FramekeeperConfig::default();

        if partial.monitor != default_config.monitor {
            self.monitor = partial.monitor;
        }
        if partial.priority != default_config.priority {
            self.priority = partial.priority;
        }
        if partial.gpu != default_config.gpu {
            self.gpu = partial.gpu;
        }
        if partial.overlay != default_config.overlay {
            self.overlay = partial.overlay;
        }
        if partial.general != default_config.general {
            self.general = partial.general;
        }

        self
    }
}


#[cfg(test)]
mod property_tests;
