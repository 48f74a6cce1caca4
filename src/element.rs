//! Handles to animated elements
//!
//! Both the priority manager (pausing preempted animations) and the GPU hint
//! manager (layer promotion hints) only ever touch an element through its
//! inline style, so that is all an [`ElementHandle`] exposes.

use parking_lot::Mutex;
use std::collections::BTreeMap;

/// `animation-play-state` style property
pub const PLAY_STATE: &str = "animation-play-state";
/// `will-change` style property
pub const WILL_CHANGE: &str = "will-change";
/// `transform` style property
pub const TRANSFORM: &str = "transform";
/// `backface-visibility` style property
pub const BACKFACE_VISIBILITY: &str = "backface-visibility";

/// Something with an inline style that an animation drives.
pub trait ElementHandle: Send + Sync {
    /// Set one inline style property.
    fn set_style(&self, property: &str, value: &str);

    /// Current inline value of a style property, if set.
    fn style(&self, property: &str) -> Option<String>;
}

/// In-memory element used by headless hosts and tests.
#[derive(Debug, Default)]
pub struct StyleMap {
    label: String,
    styles: Mutex<BTreeMap<String, String>>,
}

impl StyleMap {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            styles: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Copy of every property currently set.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.styles.lock().clone()
    }
}

impl ElementHandle for StyleMap {
    fn set_style(&self, property: &str, value: &str) {
        self.styles
            .lock()
            .insert(property.to_string(), value.to_string());
    }

    fn style(&self, property: &str) -> Option<String> {
        self.styles.lock().get(property).cloned()
    }
}
