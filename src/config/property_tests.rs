//! Property-based tests for configuration module
//!
//! These tests use proptest to generate random configurations and verify
//! invariants, serialization round-trips, and edge case handling.

use super::*;
use proptest::prelude::*;

// Strategy for generating valid monitor configurations
prop_compose! {
    fn valid_monitor_config()(
        enabled in any::<bool>(),
        history_size in 1usize..500,
        frame_budget_ms in 1.0f64..100.0,
        notify_every in 1u64..120,
        min_average_fps in 1.0f64..240.0,
        max_drop_ratio in 0.0f64..=1.0,
        tick_interval_ms in 1.0f64..100.0,
    ) -> MonitorConfig {
        MonitorConfig {
            enabled,
            history_size,
            frame_budget_ms,
            notify_every,
            min_average_fps,
            max_drop_ratio,
            tick_interval_ms,
        }
    }
}

// Strategy for generating valid priority configurations
prop_compose! {
    fn valid_priority_config()(
        max_concurrent in 1usize..32,
        low_end_fraction in 0.0f64..=1.0,
        first_match in any::<bool>(),
    ) -> PriorityConfig {
        let low_end = ((max_concurrent as f64 * low_end_fraction) as usize).max(1);
        PriorityConfig {
            max_concurrent,
            low_end_max_concurrent: low_end.min(max_concurrent),
            preemption: if first_match {
                PreemptionPolicy::FirstMatch
            } else {
                PreemptionPolicy::LowestPriorityFirst
            },
        }
    }
}

// Strategy for generating valid GPU configurations
prop_compose! {
    fn valid_gpu_config()(
        default_memory_gb in 0.5f64..64.0,
        low_end_memory_gb in 0.0f64..16.0,
        low_end_cores in 0usize..32,
        force_disable in any::<bool>(),
    ) -> GpuConfig {
        GpuConfig {
            default_memory_gb,
            low_end_memory_gb,
            low_end_cores,
            force_disable,
        }
    }
}

prop_compose! {
    fn valid_config()(
        monitor in valid_monitor_config(),
        priority in valid_priority_config(),
        gpu in valid_gpu_config(),
        overlay_enabled in any::<bool>(),
        toggle_key in "[A-Za-z+]{1,16}",
        debug in any::<bool>(),
    ) -> FramekeeperConfig {
        FramekeeperConfig {
            monitor,
            priority,
            gpu,
            overlay: OverlayConfig {
                enabled: overlay_enabled,
                toggle_key,
            },
            general: GeneralConfig { debug },
        }
    }
}

proptest! {
    #[test]
    fn test_generated_configs_validate(config in valid_config()) {
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip_preserves_config(config in valid_config()) {
        let toml_string = toml::to_string(&config).unwrap();
        let parsed: FramekeeperConfig = toml::from_str(&toml_string).unwrap();
        prop_assert_eq!(parsed, config);
    }

    #[test]
    fn test_drop_ratio_outside_unit_interval_is_rejected(
        ratio in prop_oneof![-10.0f64..-0.001, 1.001f64..10.0],
    ) {
        let mut config = FramekeeperConfig::default();
        config.monitor.max_drop_ratio = ratio;
        let err = config.validate().unwrap_err();
        let is_out_of_range = matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::OutOfRange { field: "monitor.max_drop_ratio", .. })
        );
        prop_assert!(is_out_of_range);
    }

    #[test]
    fn test_budget_above_one_second_is_rejected(budget in 1000.001f64..1.0e6) {
        let mut config = FramekeeperConfig::default();
        config.monitor.frame_budget_ms = budget;
        prop_assert!(config.validate().is_err());
    }

    #[test]
    fn test_low_end_ceiling_above_default_is_rejected(
        max_concurrent in 1usize..16,
        extra in 1usize..16,
    ) {
        let mut config = FramekeeperConfig::default();
        config.priority.max_concurrent = max_concurrent;
        config.priority.low_end_max_concurrent = max_concurrent + extra;
        prop_assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_with_defaults_is_identity(config in valid_config()) {
        let merged = config.clone().merge_partial(FramekeeperConfig::default());
        prop_assert_eq!(merged, config);
    }
}
