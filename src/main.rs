//! # framekeeper - frame budget diagnostics
//!
//! Probes the host, runs the performance monitor for a while on a tokio
//! interval ticker and reports what it saw.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

use framekeeper::config::FramekeeperConfig;
use framekeeper::gpu::{StaticCapabilityProvider, SystemCapabilityProvider};
use framekeeper::overlay::{format_metrics, DebugOverlay};
use framekeeper::{
    AnimationEntry, AnimationKind, AnimationPriority, AnimationRuntime, ElementHandle,
    PriorityManager, StyleMap,
};

#[derive(Parser)]
#[command(name = "framekeeper")]
#[command(about = "Frame-budget monitoring and animation admission diagnostics")]
#[command(version, long_version = long_version())]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/framekeeper/framekeeper.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Seconds to sample frames for
    #[arg(long, default_value_t = 3)]
    duration: u64,

    /// Print metrics as JSON lines
    #[arg(long)]
    json: bool,

    /// Pretend to run on a low-end device
    #[arg(long)]
    low_end: bool,

    /// Never use GPU hints
    #[arg(long)]
    no_gpu: bool,

    /// Run the three-animation admission scenario after sampling
    #[arg(long)]
    demo_admission: bool,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (built ",
        env!("BUILD_DATE"),
        " for ",
        env!("TARGET_TRIPLE"),
        ")"
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = FramekeeperConfig::load(&cli.config);
    let debug = cli.debug
        || loaded
            .as_ref()
            .map(|config| config.general.debug)
            .unwrap_or(false);

    // Initialize logging
    if debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    info!("🚀 Starting framekeeper {}", framekeeper::VERSION);
    if let Some(commit) = option_env!("GIT_COMMIT") {
        info!("📄 Commit: {}", commit);
    }

    let mut config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded from: {}", cli.config);
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
            FramekeeperConfig::default()
        }
    };

    // Override config with CLI flags
    if cli.no_gpu {
        config.gpu.force_disable = true;
        info!("🚫 GPU hints disabled via CLI flag");
    }
    config.monitor.enabled = true;

    let overlay_config = config.overlay.clone();
    let mut runtime = if cli.low_end {
        info!("🐢 Using low-end device profile");
        AnimationRuntime::with_interval(config, StaticCapabilityProvider::low_end())
    } else {
        AnimationRuntime::with_interval(config, SystemCapabilityProvider::new())
    };

    report_capabilities(&runtime, cli.json)?;

    let overlay = DebugOverlay::attach(runtime.monitor(), &overlay_config);
    overlay.set_visible(!cli.json);

    let json = cli.json;
    let printer = runtime.monitor().subscribe(move |metrics| {
        if json {
            match serde_json::to_string(metrics) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("❌ Failed to encode metrics: {}", e),
            }
        } else {
            println!("{}", format_metrics(metrics));
        }
    });

    runtime.init();
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(cli.duration)) => {}
        _ = tokio::signal::ctrl_c() => info!("🛑 Interrupted"),
    }
    printer.unsubscribe();

    if cli.demo_admission {
        demo_admission(&runtime)?;
    }

    runtime.dispose();

    let metrics = runtime.monitor().metrics();
    if cli.json {
        println!("{}", serde_json::to_string(&metrics).context("Failed to encode metrics")?);
    } else {
        for line in overlay.render() {
            println!("{}", line);
        }
    }

    info!("👋 framekeeper shutting down");
    Ok(())
}

fn report_capabilities(runtime: &AnimationRuntime, json: bool) -> Result<()> {
    let gpu = runtime.gpu();
    let capabilities = gpu.capabilities();

    if json {
        let report = serde_json::json!({
            "capabilities": capabilities,
            "gpu_acceleration": gpu.should_use_gpu_acceleration(),
            "optimal_properties": gpu.optimal_animation_properties(),
            "max_concurrent": runtime.priorities().max_concurrent(),
        });
        println!(
            "{}",
            serde_json::to_string(&report).context("Failed to encode capabilities")?
        );
    } else {
        println!(
            "GPU: {}  memory: {:.1} GB  cores: {}  low-end: {}",
            capabilities.supports_gpu,
            capabilities.memory_limit_gb,
            capabilities
                .logical_cores
                .map(|cores| cores.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            capabilities.is_low_end
        );
        println!(
            "GPU acceleration: {}  optimal properties: {}",
            gpu.should_use_gpu_acceleration(),
            gpu.optimal_animation_properties().join(", ")
        );
        println!(
            "Concurrent animations: {}",
            runtime.priorities().max_concurrent()
        );
    }

    Ok(())
}

/// Two slots, then low, medium and high requests in that order.
fn demo_admission(runtime: &AnimationRuntime) -> Result<()> {
    let mut priorities = PriorityManager::new(
        runtime.monitor().clone(),
        2,
        runtime.config().priority.preemption,
    );

    let scenario = [
        ("A", AnimationPriority::Low),
        ("B", AnimationPriority::Medium),
        ("C", AnimationPriority::High),
    ];

    let mut elements = Vec::new();
    for (id, priority) in scenario {
        let element = Arc::new(StyleMap::new(id));
        runtime
            .gpu()
            .optimize_element(element.as_ref(), AnimationKind::Transform);
        priorities.register_animation(
            AnimationEntry::new(id, priority)
                .with_element(element.clone())
                .with_callback(|id| info!("⏸️ {} yielded its slot", id)),
        );
        elements.push(element);
    }

    for (id, priority) in scenario {
        let granted = priorities.request_animation(id);
        println!(
            "request {} ({}): {}",
            id,
            priority,
            if granted { "granted" } else { "denied" }
        );
    }

    println!("active: [{}]", priorities.active_ids().join(", "));
    for element in &elements {
        runtime.gpu().cleanup_element(element.as_ref());
        println!(
            "{}: play-state={}",
            element.label(),
            element
                .style(framekeeper::element::PLAY_STATE)
                .unwrap_or_else(|| "running".to_string())
        );
    }

    Ok(())
}
