//! Status and permission commands

use super::EngineState;
use crate::capture::Recording;
use crate::engine::EngineStatus;
use tauri::State;

#[tauri::command]
pub async fn get_engine_status(state: State<'_, EngineState>) -> Result<EngineStatus, String> {
    Ok(state.controller.status())
}

/// The sealed recording, if any, for display
#[tauri::command]
pub async fn get_recording(state: State<'_, EngineState>) -> Result<Option<Recording>, String> {
    Ok(state.controller.recording())
}

/// Check if input monitoring and injection are allowed
#[tauri::command]
pub async fn check_input_permission(state: State<'_, EngineState>) -> Result<bool, String> {
    Ok(state.controller.has_permission())
}

/// Prompt the user for input permissions where the platform supports it
#[tauri::command]
pub async fn request_input_permission(state: State<'_, EngineState>) -> Result<bool, String> {
    Ok(state.controller.request_permission())
}
