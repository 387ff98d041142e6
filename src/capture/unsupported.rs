//! Fallback for targets without a native backend
//!
//! Builds everywhere; every capture or injection attempt reports
//! `PlatformError::Unsupported`. On Linux enable the `x11` feature for a
//! working backend.

use crate::capture::input::types::{InputEventKind, Position};
use crate::capture::traits::{HookCallback, HookHandle, InputBackend, PlatformError, PlatformResult};

#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackend;

impl InputBackend for UnsupportedBackend {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn has_permission(&self) -> bool {
        true
    }

    fn request_permission(&self) -> bool {
        true
    }

    fn start_hook(&self, _callback: HookCallback) -> PlatformResult<Box<dyn HookHandle>> {
        Err(PlatformError::Unsupported(
            "global pointer hooks are not available in this build".to_string(),
        ))
    }

    fn inject(&self, _kind: &InputEventKind, _position: Position) -> PlatformResult<()> {
        Err(PlatformError::Unsupported(
            "synthetic input is not available in this build".to_string(),
        ))
    }
}
