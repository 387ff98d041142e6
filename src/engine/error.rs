//! Engine error taxonomy

use crate::capture::traits::PlatformError;
use crate::engine::state::{EngineCommand, EngineMode};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors that can be returned by engine commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0} is already active")]
    AlreadyActive(&'static str),

    #[error("{0} is not active")]
    NotActive(&'static str),

    #[error("Engine busy: cannot {command} while {state}")]
    EngineBusy {
        state: EngineMode,
        command: EngineCommand,
    },

    #[error("Nothing has been recorded")]
    EmptyRecording,

    #[error("Injection failure: {0}")]
    InjectionFailure(String),

    #[error("Invalid state: cannot {command} while {state}")]
    InvalidState {
        state: EngineMode,
        command: EngineCommand,
    },

    #[error("Platform error: {0}")]
    Platform(String),
}

impl EngineError {
    /// Stable identifier for the presentation layer
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::PermissionDenied(_) => "permissionDenied",
            EngineError::AlreadyActive(_) => "alreadyActive",
            EngineError::NotActive(_) => "notActive",
            EngineError::EngineBusy { .. } => "engineBusy",
            EngineError::EmptyRecording => "emptyRecording",
            EngineError::InjectionFailure(_) => "injectionFailure",
            EngineError::InvalidState { .. } => "invalidState",
            EngineError::Platform(_) => "platform",
        }
    }
}

impl From<PlatformError> for EngineError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied(msg) => EngineError::PermissionDenied(msg),
            PlatformError::InjectionRejected(msg) => EngineError::InjectionFailure(msg),
            other => EngineError::Platform(other.to_string()),
        }
    }
}

impl Serialize for EngineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("EngineError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_errors_map_to_engine_taxonomy() {
        let denied: EngineError = PlatformError::PermissionDenied("no grant".into()).into();
        assert_eq!(denied, EngineError::PermissionDenied("no grant".into()));

        let rejected: EngineError = PlatformError::InjectionRejected("grabbed".into()).into();
        assert_eq!(rejected.kind(), "injectionFailure");

        let hook: EngineError = PlatformError::HookFailed("tap".into()).into();
        assert_eq!(hook.kind(), "platform");
    }

    #[test]
    fn test_busy_message_names_state_and_command() {
        let err = EngineError::EngineBusy {
            state: EngineMode::Recording,
            command: EngineCommand::StartPlayback,
        };
        assert_eq!(
            err.to_string(),
            "Engine busy: cannot start_playback while recording"
        );

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "engineBusy");
    }
}
