//! Pointer input capture
//!
//! The event model shared by capture and playback, and the listener that
//! feeds platform hook deliveries into the active recording.

pub mod listener;
pub mod types;

pub use listener::InputListener;
pub use types::{InputEvent, InputEventKind, MouseButton, Position, Recording, ScrollDelta};
