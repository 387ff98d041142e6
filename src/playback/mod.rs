//! Playback of recorded input
//!
//! The scheduler replays a recording on its own thread; the notifier carries
//! progress and completion back to whoever is listening.

pub mod notifier;
pub mod scheduler;

pub use notifier::{
    EngineNotification, EventNotifier, ForwarderRegistry, NotificationSink, PlaybackEndReason, PlaybackEnded,
    PlaybackProgress,
};
pub use scheduler::{PlaybackOutcome, PlaybackReport, PlaybackScheduler, PlaybackSession, SchedulerOptions};
