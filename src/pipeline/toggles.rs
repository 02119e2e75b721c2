//! User-controlled switches read once per turn

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggles {
    pub context_enabled: bool,
    pub fact_check_enabled: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            context_enabled: true,
            fact_check_enabled: true,
        }
    }
}

/// Partial update; absent fields keep their value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ToggleUpdate {
    #[serde(default)]
    pub context_enabled: Option<bool>,
    #[serde(default)]
    pub fact_check_enabled: Option<bool>,
}

/// Process-wide toggle storage
#[derive(Debug)]
pub struct ToggleState {
    context_enabled: AtomicBool,
    fact_check_enabled: AtomicBool,
}

impl ToggleState {
    pub fn new(initial: Toggles) -> Self {
        Self {
            context_enabled: AtomicBool::new(initial.context_enabled),
            fact_check_enabled: AtomicBool::new(initial.fact_check_enabled),
        }
    }

    pub fn snapshot(&self) -> Toggles {
        Toggles {
            context_enabled: self.context_enabled.load(Ordering::SeqCst),
            fact_check_enabled: self.fact_check_enabled.load(Ordering::SeqCst),
        }
    }

    /// Apply `update` and return the resulting toggles
    pub fn apply(&self, update: ToggleUpdate) -> Toggles {
        if let Some(enabled) = update.context_enabled {
            self.context_enabled.store(enabled, Ordering::SeqCst);
        }
        if let Some(enabled) = update.fact_check_enabled {
            self.fact_check_enabled.store(enabled, Ordering::SeqCst);
        }
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update() {
        let state = ToggleState::new(Toggles::default());
        let toggles = state.apply(ToggleUpdate {
            fact_check_enabled: Some(false),
            ..Default::default()
        });
        assert_eq!(
            toggles,
            Toggles {
                context_enabled: true,
                fact_check_enabled: false
            }
        );
        assert_eq!(state.apply(ToggleUpdate::default()), toggles);
    }

    #[test]
    fn test_update_deserializes_missing_fields() {
        let update: ToggleUpdate = serde_json::from_str(r#"{"context_enabled": false}"#).unwrap();
        assert_eq!(update.context_enabled, Some(false));
        assert_eq!(update.fact_check_enabled, None);
    }
}
