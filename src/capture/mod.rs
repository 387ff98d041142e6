//! Platform-specific input capture and injection
//!
//! Each target gets its own `InputBackend`; `default_backend` picks the one
//! compiled for this build.

pub mod input;
pub mod traits;

#[cfg(test)]
pub mod mock;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(all(feature = "x11", not(any(target_os = "macos", target_os = "windows"))))]
pub mod x11;

#[cfg(not(any(target_os = "macos", target_os = "windows", feature = "x11")))]
pub mod unsupported;

use std::sync::Arc;

// Re-export traits
pub use traits::{HookCallback, HookHandle, InputBackend, PlatformError, PlatformResult};

// Re-export input types and listener
pub use input::{InputEvent, InputEventKind, InputListener, MouseButton, Position, Recording, ScrollDelta};

/// The backend for the platform this crate was built for
pub fn default_backend() -> Arc<dyn InputBackend> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(macos::MacInputBackend::new())
    }

    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::WindowsInputBackend::new())
    }

    #[cfg(all(feature = "x11", not(any(target_os = "macos", target_os = "windows"))))]
    {
        Arc::new(x11::X11InputBackend::new())
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", feature = "x11")))]
    {
        Arc::new(unsupported::UnsupportedBackend)
    }
}
