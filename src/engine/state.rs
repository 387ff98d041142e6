//! Engine modes and the transition table

use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Current engine mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineMode {
    /// No recording exists
    #[default]
    Idle,
    /// Listener is capturing
    Recording,
    /// A non-empty recording is ready for playback
    Armed,
    /// Scheduler is replaying
    Playing,
}

impl std::fmt::Display for EngineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineMode::Idle => write!(f, "idle"),
            EngineMode::Recording => write!(f, "recording"),
            EngineMode::Armed => write!(f, "armed"),
            EngineMode::Playing => write!(f, "playing"),
        }
    }
}

impl EngineMode {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            EngineMode::Idle => 0,
            EngineMode::Recording => 1,
            EngineMode::Armed => 2,
            EngineMode::Playing => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => EngineMode::Recording,
            2 => EngineMode::Armed,
            3 => EngineMode::Playing,
            _ => EngineMode::Idle,
        }
    }
}

/// Commands that change engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCommand {
    StartMouseListener,
    StopMouseListener,
    ClearPlaybackQueue,
    StartPlayback,
    StopPlayback,
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::StartMouseListener => write!(f, "start_mouse_listener"),
            EngineCommand::StopMouseListener => write!(f, "stop_mouse_listener"),
            EngineCommand::ClearPlaybackQueue => write!(f, "clear_playback_queue"),
            EngineCommand::StartPlayback => write!(f, "start_playback"),
            EngineCommand::StopPlayback => write!(f, "stop_playback"),
        }
    }
}

/// Check `command` against the current mode and return the mode it leads to.
///
/// `StopMouseListener` always yields `Armed` here; the controller drops to
/// `Idle` when nothing was captured.
pub fn transition(mode: EngineMode, command: EngineCommand) -> EngineResult<EngineMode> {
    use EngineCommand::*;
    use EngineMode::*;

    match (mode, command) {
        (Idle | Armed, StartMouseListener) => Ok(Recording),
        (Recording, StopMouseListener) => Ok(Armed),
        (Armed, ClearPlaybackQueue) => Ok(Idle),
        (Armed, StartPlayback) => Ok(Playing),
        (Playing, StopPlayback) => Ok(Armed),

        (Idle, StartPlayback) => Err(EngineError::EmptyRecording),

        (Recording, StartPlayback | ClearPlaybackQueue) | (Playing, StartMouseListener | ClearPlaybackQueue) => {
            Err(EngineError::EngineBusy {
                state: mode,
                command,
            })
        }

        (Recording, StartMouseListener) => Err(EngineError::AlreadyActive("mouse listener")),
        (Playing, StartPlayback) => Err(EngineError::AlreadyActive("playback")),
        (Idle | Armed | Playing, StopMouseListener) => Err(EngineError::NotActive("mouse listener")),
        (Idle | Armed | Recording, StopPlayback) => Err(EngineError::NotActive("playback")),

        (Idle, ClearPlaybackQueue) => Err(EngineError::InvalidState {
            state: mode,
            command,
        }),
    }
}

/// Snapshot of engine state for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub mode: EngineMode,
    /// Events in the current recording (or captured so far while recording)
    pub event_count: usize,
    pub duration_ms: u64,
    /// Loop flag of the running playback, if any
    pub loop_playback: Option<bool>,
}

/// Returned when capture stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub event_count: usize,
    pub duration_ms: u64,
}
