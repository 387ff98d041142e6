//! Engine controller and its state machine
//!
//! Mediates the listener, the recording store and the playback scheduler, and
//! guarantees that at most one of listener or scheduler runs at a time.

pub mod controller;
pub mod error;
pub mod state;

pub use controller::EngineController;
pub use error::{EngineError, EngineResult};
pub use state::{EngineCommand, EngineMode, EngineStatus, RecordingSummary};
