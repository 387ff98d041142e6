//! macOS input backend
//!
//! Capture uses a listen-only CGEventTap at the HID level; injection posts
//! CGEvents to the HID tap location. Listening needs the Input Monitoring
//! grant and posting needs Accessibility.

pub mod inject;
pub mod input;
pub mod permissions;

use crate::capture::input::types::{InputEventKind, Position};
use crate::capture::traits::{HookCallback, HookHandle, InputBackend, PlatformResult};

#[derive(Debug, Default)]
pub struct MacInputBackend;

impl MacInputBackend {
    pub fn new() -> Self {
        Self
    }
}

impl InputBackend for MacInputBackend {
    fn name(&self) -> &'static str {
        "macos-cgevent"
    }

    fn has_permission(&self) -> bool {
        permissions::has_input_monitoring_permission() && permissions::has_accessibility_permission()
    }

    fn request_permission(&self) -> bool {
        let listen = permissions::request_input_monitoring_permission();
        let post = permissions::request_accessibility_permission();
        listen && post
    }

    fn start_hook(&self, callback: HookCallback) -> PlatformResult<Box<dyn HookHandle>> {
        input::start_event_tap(callback)
    }

    fn inject(&self, kind: &InputEventKind, position: Position) -> PlatformResult<()> {
        inject::post_event(kind, position)
    }
}
