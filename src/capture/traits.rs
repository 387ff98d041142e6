//! Platform capability interface
//!
//! Global pointer hooks and synthetic input injection differ per OS. The
//! listener and the playback scheduler only ever talk to an `InputBackend`;
//! the concrete backend is chosen at build time in `capture::default_backend`.

use crate::capture::input::types::{InputEventKind, Position};
use thiserror::Error;

/// Errors reported by a platform backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not supported on this platform: {0}")]
    Unsupported(String),

    #[error("Failed to install input hook: {0}")]
    HookFailed(String),

    #[error("Synthetic input rejected: {0}")]
    InjectionRejected(String),
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Receives every pointer event the OS hook delivers.
///
/// Called on the hook's own thread; implementations must return quickly.
pub type HookCallback = Box<dyn FnMut(InputEventKind, Position) + Send + 'static>;

/// A live global hook. Dropping it without calling `stop` leaks the hook
/// thread until the process exits.
pub trait HookHandle: Send {
    /// Unsubscribe and wait for the hook thread to finish delivering.
    fn stop(self: Box<Self>) -> PlatformResult<()>;
}

/// OS input capability: permission checks, global hook, and injection
pub trait InputBackend: Send + Sync + 'static {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Whether the process may observe and inject pointer input
    fn has_permission(&self) -> bool;

    /// Ask the OS for the capability. Returns the state after asking.
    fn request_permission(&self) -> bool;

    /// Subscribe to the global pointer event stream on a dedicated thread.
    fn start_hook(&self, callback: HookCallback) -> PlatformResult<Box<dyn HookHandle>>;

    /// Issue one synthetic pointer event.
    fn inject(&self, kind: &InputEventKind, position: Position) -> PlatformResult<()>;
}
