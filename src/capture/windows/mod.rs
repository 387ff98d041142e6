//! Windows input backend
//!
//! Capture uses a low-level mouse hook (`WH_MOUSE_LL`) on a thread with its
//! own message loop; injection goes through `SetCursorPos` and `SendInput`.

pub mod inject;
pub mod input;

use crate::capture::input::types::{InputEventKind, Position};
use crate::capture::traits::{HookCallback, HookHandle, InputBackend, PlatformResult};

#[derive(Debug, Default)]
pub struct WindowsInputBackend;

impl WindowsInputBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Windows doesn't require an explicit grant for low-level hooks or SendInput
impl InputBackend for WindowsInputBackend {
    fn name(&self) -> &'static str {
        "windows-hook"
    }

    fn has_permission(&self) -> bool {
        true
    }

    fn request_permission(&self) -> bool {
        true
    }

    fn start_hook(&self, callback: HookCallback) -> PlatformResult<Box<dyn HookHandle>> {
        input::start_mouse_hook(callback)
    }

    fn inject(&self, kind: &InputEventKind, position: Position) -> PlatformResult<()> {
        inject::send_input(kind, position)
    }
}
