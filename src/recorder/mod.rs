//! Recording storage
//!
//! Holds the one recording the engine owns and hands out append access to the
//! listener while capture is open.

pub mod store;

pub use store::{RecordingSink, RecordingStore};
