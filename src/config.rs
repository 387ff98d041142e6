//! Engine configuration
//!
//! Loaded from a JSON file named by `MOUSE_REPLAY_CONFIG`; every field has a
//! default so a partial (or missing) file is fine.

use crate::playback::scheduler::SchedulerOptions;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MOUSE_REPLAY_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Publish playback progress every N injected events
    pub progress_interval_events: u64,
    /// Longest single scheduler sleep, in milliseconds
    pub cancel_poll_interval_ms: u64,
    /// Buffer size of the notification channel
    pub notification_capacity: usize,
    /// Publish every captured event while recording
    pub echo_captured_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_interval_events: 25,
            cancel_poll_interval_ms: 10,
            notification_capacity: 256,
            echo_captured_events: false,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config.normalized())
    }

    /// Load from `MOUSE_REPLAY_CONFIG`, or defaults when it is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Clamp values that would stall the engine
    pub fn normalized(mut self) -> Self {
        self.progress_interval_events = self.progress_interval_events.max(1);
        self.cancel_poll_interval_ms = self.cancel_poll_interval_ms.max(1);
        self.notification_capacity = self.notification_capacity.max(1);
        self
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            progress_interval_events: self.progress_interval_events.max(1),
            cancel_poll_interval: Duration::from_millis(self.cancel_poll_interval_ms.max(1)),
        }
    }
}
