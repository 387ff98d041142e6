//! Capture and playback commands

use super::EngineState;
use crate::engine::RecordingSummary;
use crate::playback::{EngineNotification, NotificationSink};
use async_trait::async_trait;
use tauri::ipc::Channel;
use tauri::{State, Window};

/// Start capturing pointer input into a fresh recording
#[tauri::command]
pub async fn start_mouse_listener(state: State<'_, EngineState>) -> Result<(), String> {
    state
        .controller
        .start_mouse_listener()
        .await
        .map_err(|e| e.to_string())
}

/// Stop capturing and keep the recording for playback
#[tauri::command]
pub async fn stop_mouse_listener(state: State<'_, EngineState>) -> Result<RecordingSummary, String> {
    state
        .controller
        .stop_mouse_listener()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn clear_playback_queue(state: State<'_, EngineState>) -> Result<(), String> {
    state
        .controller
        .clear_playback_queue()
        .await
        .map_err(|e| e.to_string())
}

/// Replay the current recording. Returns the playback session id.
#[tauri::command]
pub async fn start_playback(
    state: State<'_, EngineState>,
    loop_playback: bool,
) -> Result<String, String> {
    state
        .controller
        .start_playback(loop_playback)
        .await
        .map(|id| id.to_string())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn stop_playback(state: State<'_, EngineState>) -> Result<(), String> {
    state
        .controller
        .stop_playback()
        .await
        .map_err(|e| e.to_string())
}

struct ChannelSink(Channel<EngineNotification>);

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, notification: EngineNotification) -> bool {
        self.0.send(notification).is_ok()
    }
}

/// Stream every engine notification to `on_event`. Subscribing again from
/// the same window replaces its previous stream.
#[tauri::command]
pub async fn playback_events(
    window: Window,
    state: State<'_, EngineState>,
    on_event: Channel<EngineNotification>,
) -> Result<(), String> {
    state
        .forwarders
        .forward(window.label(), state.controller.notifier(), ChannelSink(on_event));
    Ok(())
}
