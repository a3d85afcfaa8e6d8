use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-action request limits, counted per client IP per minute.
/// controller -> action -> allowed requests. Absent entries are unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateLimitsConfig {
    limits: HashMap<String, HashMap<String, u32>>,
}

impl RateLimitsConfig {
    pub fn limit_for(&self, controller: &str, action: &str) -> Option<u32> {
        self.limits.get(controller)?.get(action).copied()
    }

    pub fn set(&mut self, controller: impl Into<String>, action: impl Into<String>, limit: u32) {
        self.limits
            .entry(controller.into())
            .or_default()
            .insert(action.into(), limit);
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}
