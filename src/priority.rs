//! Animation admission control
//!
//! The [`PriorityManager`] decides whether a registered animation may start
//! given how many are already running and how the frame rate looks:
//!
//! - below the concurrency ceiling every request is granted
//! - at the ceiling, a janky frame rate only lets `critical` animations through
//! - otherwise a lower-priority running animation is paused to make room
//! - `low` requests never preempt anything
//!
//! The ceiling is fixed when the manager is built (3 on low-end devices,
//! 5 otherwise by default).

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{PreemptionPolicy, PriorityConfig};
use crate::element::{ElementHandle, PLAY_STATE};
use crate::gpu::DeviceCapabilities;
use crate::monitor::MetricsSource;

/// Animation importance, `Low` < `Medium` < `High` < `Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl AnimationPriority {
    /// Ordinal on the 1 (low) ..= 4 (critical) scale
    pub fn rank(self) -> u8 {
        match self {
            AnimationPriority::Low => 1,
            AnimationPriority::Medium => 2,
            AnimationPriority::High => 3,
            AnimationPriority::Critical => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnimationPriority::Low => "low",
            AnimationPriority::Medium => "medium",
            AnimationPriority::High => "high",
            AnimationPriority::Critical => "critical",
        }
    }
}

impl fmt::Display for AnimationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no [`AnimationPriority`]
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown animation priority: {0}")]
pub struct ParsePriorityError(pub String);

impl FromStr for AnimationPriority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(AnimationPriority::Low),
            "medium" => Ok(AnimationPriority::Medium),
            "high" => Ok(AnimationPriority::High),
            "critical" => Ok(AnimationPriority::Critical),
            other => Err(ParsePriorityError(other.to_string())),
        }
    }
}

/// Called with the animation id when it is preempted
pub type PreemptCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A registered animation.
#[derive(Clone)]
pub struct AnimationEntry {
    pub id: String,
    pub priority: AnimationPriority,
    /// Element whose playback is paused on preemption
    pub element: Option<Arc<dyn ElementHandle>>,
    /// Notified when the animation loses its slot
    pub callback: Option<PreemptCallback>,
}

impl AnimationEntry {
    pub fn new(id: impl Into<String>, priority: AnimationPriority) -> Self {
        Self {
            id: id.into(),
            priority,
            element: None,
            callback: None,
        }
    }

    pub fn with_element(mut self, element: Arc<dyn ElementHandle>) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for AnimationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationEntry")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("element", &self.element.is_some())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

struct Registered {
    entry: AnimationEntry,
    /// Paused by preemption and not yet resumed
    paused: bool,
}

/// Concurrency gate for animations.
pub struct PriorityManager {
    metrics: Arc<dyn MetricsSource>,
    max_concurrent: usize,
    policy: PreemptionPolicy,
    registry: HashMap<String, Registered>,
    /// Active ids, oldest activation first
    active: Vec<String>,
}

impl PriorityManager {
    pub fn new(
        metrics: Arc<dyn MetricsSource>,
        max_concurrent: usize,
        policy: PreemptionPolicy,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        info!(
            "🚦 Animation priority manager: {} concurrent, {:?} preemption",
            max_concurrent, policy
        );

        Self {
            metrics,
            max_concurrent,
            policy,
            registry: HashMap::new(),
            active: Vec::with_capacity(max_concurrent),
        }
    }

    /// Ceiling chosen from the device class
    pub fn for_device(
        metrics: Arc<dyn MetricsSource>,
        capabilities: &DeviceCapabilities,
        config: &PriorityConfig,
    ) -> Self {
        let max_concurrent = if capabilities.is_low_end {
            config.low_end_max_concurrent
        } else {
            config.max_concurrent
        };
        Self::new(metrics, max_concurrent, config.preemption)
    }

    /// Store an animation. Re-registering an id replaces its entry but keeps
    /// its active state. A paused element that is swapped out is resumed.
    pub fn register_animation(&mut self, entry: AnimationEntry) {
        debug!("🚦 Registered '{}' ({})", entry.id, entry.priority);
        let paused = match self.registry.get(&entry.id) {
            Some(existing) if existing.paused => {
                let same_element = match (&existing.entry.element, &entry.element) {
                    (Some(old), Some(new)) => Arc::ptr_eq(old, new),
                    _ => false,
                };
                if !same_element {
                    if let Some(old) = &existing.entry.element {
                        old.set_style(PLAY_STATE, "running");
                    }
                }
                same_element
            }
            _ => false,
        };
        self.registry
            .insert(entry.id.clone(), Registered { entry, paused });
    }

    /// Ask to start a registered animation. Returns whether it may run.
    pub fn request_animation(&mut self, id: &str) -> bool {
        let Some(priority) = self.registry.get(id).map(|r| r.entry.priority) else {
            debug!("🚦 Request for unknown animation '{}'", id);
            return false;
        };

        if self.is_active(id) {
            return true;
        }

        if self.active.len() < self.max_concurrent {
            self.activate(id);
            return true;
        }

        let metrics = self.metrics.metrics();
        if !metrics.is_performant && priority != AnimationPriority::Critical {
            debug!(
                "🚦 Denied '{}' ({}): {:.1} fps, {} dropped",
                id, priority, metrics.average_fps, metrics.dropped_frames
            );
            return false;
        }

        if priority != AnimationPriority::Low {
            if let Some(victim) = self.pick_victim(priority) {
                self.preempt(&victim);
            }
        }

        if self.active.len() < self.max_concurrent {
            self.activate(id);
            true
        } else {
            debug!("🚦 Denied '{}' ({}): no lower-priority slot", id, priority);
            false
        }
    }

    /// Mark an animation finished. No-op when it is not active.
    pub fn release_animation(&mut self, id: &str) {
        if let Some(pos) = self.active.iter().position(|active| active == id) {
            self.active.remove(pos);
            debug!("🚦 Released '{}'", id);
        }
    }

    /// Forget an animation entirely. No-op when it is not registered.
    pub fn unregister_animation(&mut self, id: &str) {
        self.release_animation(id);
        if self.registry.remove(id).is_some() {
            debug!("🚦 Unregistered '{}'", id);
        }
    }

    pub fn active_animations_count(&self) -> usize {
        self.active.len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn policy(&self) -> PreemptionPolicy {
        self.policy
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|active| active == id)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.registry.contains_key(id)
    }

    /// Active ids in activation order
    pub fn active_ids(&self) -> Vec<String> {
        self.active.clone()
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    fn activate(&mut self, id: &str) {
        if let Some(registered) = self.registry.get_mut(id) {
            if registered.paused {
                if let Some(element) = &registered.entry.element {
                    element.set_style(PLAY_STATE, "running");
                }
                registered.paused = false;
            }
        }
        self.active.push(id.to_string());
        debug!(
            "🚦 Granted '{}' ({}/{})",
            id,
            self.active.len(),
            self.max_concurrent
        );
    }

    /// Active animation that should give up its slot to `requester`
    fn pick_victim(&self, requester: AnimationPriority) -> Option<String> {
        let mut candidates = self.active.iter().filter_map(|id| {
            let priority = self.registry.get(id)?.entry.priority;
            (priority < requester).then_some((id, priority))
        });

        let victim = match self.policy {
            PreemptionPolicy::FirstMatch => candidates.next(),
            // min_by_key keeps the first of equal keys, i.e. the oldest activation
            PreemptionPolicy::LowestPriorityFirst => candidates.min_by_key(|(_, p)| *p),
        };
        victim.map(|(id, _)| id.clone())
    }

    fn preempt(&mut self, id: &str) {
        self.release_animation(id);

        let Some(registered) = self.registry.get_mut(id) else {
            return;
        };
        if let Some(element) = &registered.entry.element {
            element.set_style(PLAY_STATE, "paused");
            registered.paused = true;
        }
        if let Some(callback) = &registered.entry.callback {
            callback(id);
        }

        info!("⏸️ Preempted '{}' ({})", id, registered.entry.priority);
    }
}
