//! Tauri command handlers
//!
//! IPC entry points for the webview. Engine errors are rendered to strings
//! here; the engine itself never sees Tauri types.

pub mod playback;
pub mod system;

use crate::engine::EngineController;
use crate::playback::{EngineNotification, ForwarderRegistry, NotificationSink};
use async_trait::async_trait;
use tauri::{AppHandle, Emitter};

/// Application state shared by every command
pub struct EngineState {
    pub controller: EngineController,
    /// `playback_events` channels, one per window
    pub forwarders: ForwarderRegistry,
}

impl EngineState {
    pub fn new(controller: EngineController) -> Self {
        Self {
            controller,
            forwarders: ForwarderRegistry::new(),
        }
    }
}

/// Re-emits engine notifications as global app events, one event name per
/// notification topic.
pub struct AppEmitter {
    handle: AppHandle,
}

impl AppEmitter {
    pub fn new(handle: AppHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl NotificationSink for AppEmitter {
    async fn deliver(&self, notification: EngineNotification) -> bool {
        if let Err(e) = self.handle.emit(notification.topic(), &notification) {
            tracing::warn!("Failed to emit {}: {}", notification.topic(), e);
        }
        true
    }
}
