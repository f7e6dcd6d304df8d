//! Triggers, key bindings and edge detection.

use crate::coord::RegionAddress;
use crate::scheduler::WarmMode;

/// Default key for the standard warm binding.
pub const DEFAULT_STANDARD_KEY: &str = "F8";

/// Default key for the aggressive warm binding.
pub const DEFAULT_AGGRESSIVE_KEY: &str = "F9";

/// Where a trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// A key binding press. Requires an active session.
    Key,
    /// A command invocation. Requires an active, privileged session.
    Command,
}

/// A discrete request to warm a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub mode: WarmMode,
    /// Explicit target; the actor's region is used when absent.
    pub region: Option<RegionAddress>,
}

impl Trigger {
    pub fn key(mode: WarmMode) -> Self {
        Self {
            kind: TriggerKind::Key,
            mode,
            region: None,
        }
    }

    pub fn command(mode: WarmMode, region: Option<RegionAddress>) -> Self {
        Self {
            kind: TriggerKind::Command,
            mode,
            region,
        }
    }
}

/// A named key mapped to a warm mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub name: String,
    pub key: String,
    pub mode: WarmMode,
}

impl KeyBinding {
    pub fn new(name: impl Into<String>, key: impl Into<String>, mode: WarmMode) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            mode,
        }
    }

    /// The `standard` and `aggressive` bindings on their default keys.
    pub fn defaults() -> Vec<KeyBinding> {
        vec![
            KeyBinding::new("standard", DEFAULT_STANDARD_KEY, WarmMode::Standard),
            KeyBinding::new("aggressive", DEFAULT_AGGRESSIVE_KEY, WarmMode::Aggressive),
        ]
    }

    /// Whether `key` names this binding's key (case-insensitive).
    pub fn matches(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key.trim())
    }
}

/// Converts a level signal (is pressed) into rising edges (was just pressed).
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    pressed: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current level. Returns `true` only on a released → pressed transition.
    pub fn update(&mut self, pressed: bool) -> bool {
        let rising = pressed && !self.pressed;
        self.pressed = pressed;
        rising
    }
}
