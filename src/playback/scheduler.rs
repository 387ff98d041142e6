//! Playback scheduler
//!
//! Replays a recording on a dedicated thread. Every event's wake time is
//! derived from the cycle's start instant plus the event offset, so sleep
//! overshoot never accumulates across events or cycles. Cancellation is a
//! shared flag checked before each sleep slice and before each injection.

use crate::capture::input::types::Recording;
use crate::capture::traits::InputBackend;
use crate::engine::error::EngineError;
use crate::playback::notifier::{EngineNotification, EventNotifier, PlaybackProgress};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Tunables for one scheduler run
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub progress_interval_events: u64,
    /// Longest single sleep; bounds cancellation latency across long gaps
    pub cancel_poll_interval: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            progress_interval_events: 25,
            cancel_poll_interval: Duration::from_millis(10),
        }
    }
}

/// Everything one playback invocation owns
pub struct PlaybackSession {
    pub id: Uuid,
    pub recording: Recording,
    pub loop_playback: bool,
    pub cancel: Arc<AtomicBool>,
}

impl PlaybackSession {
    pub fn new(recording: Recording, loop_playback: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            recording,
            loop_playback,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// How a replay thread finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
    Failed(EngineError),
}

/// Result of a replay thread, returned through its join handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    pub outcome: PlaybackOutcome,
    pub events_injected: u64,
    pub cycles_completed: u64,
}

/// A running replay thread
pub struct ScheduledPlayback {
    pub session_id: Uuid,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<PlaybackReport>,
}

impl ScheduledPlayback {
    /// Ask the replay thread to stop at its next check.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Block until the replay thread has exited.
    pub fn join(self) -> PlaybackReport {
        match self.handle.join() {
            Ok(report) => report,
            Err(_) => {
                tracing::error!("Playback thread for session {} panicked", self.session_id);
                PlaybackReport {
                    outcome: PlaybackOutcome::Failed(EngineError::Platform(
                        "playback thread panicked".to_string(),
                    )),
                    events_injected: 0,
                    cycles_completed: 0,
                }
            }
        }
    }
}

pub struct PlaybackScheduler;

impl PlaybackScheduler {
    /// Spawn the replay thread for `session`.
    ///
    /// `done` fires as the thread's last action so an observer can come and
    /// join it.
    pub fn start(
        session: PlaybackSession,
        backend: Arc<dyn InputBackend>,
        notifier: EventNotifier,
        options: SchedulerOptions,
        done: oneshot::Sender<Uuid>,
    ) -> std::io::Result<ScheduledPlayback> {
        let session_id = session.id;
        let cancel = session.cancel.clone();

        let handle = std::thread::Builder::new()
            .name(format!("playback-{}", session_id))
            .spawn(move || {
                let report = run_session(&session, backend.as_ref(), &notifier, options);
                let _ = done.send(session.id);
                report
            })?;

        Ok(ScheduledPlayback {
            session_id,
            cancel,
            handle,
        })
    }
}

/// Replay loop. Runs on the scheduler thread.
pub(crate) fn run_session(
    session: &PlaybackSession,
    backend: &dyn InputBackend,
    notifier: &EventNotifier,
    options: SchedulerOptions,
) -> PlaybackReport {
    let events = session.recording.events();
    let progress_every = options.progress_interval_events.max(1);
    let mut events_injected: u64 = 0;
    let mut cycle: u64 = 0;

    tracing::info!(
        "Playback {} started (events={}, loop={})",
        session.id,
        events.len(),
        session.loop_playback
    );

    let outcome = 'cycles: loop {
        if events.is_empty() {
            break PlaybackOutcome::Completed;
        }

        let cycle_start = Instant::now();

        for event in events {
            let wake_at = cycle_start + event.offset;
            if !sleep_until(wake_at, &session.cancel, options.cancel_poll_interval) {
                break 'cycles PlaybackOutcome::Cancelled;
            }

            if session.cancel.load(Ordering::SeqCst) {
                break 'cycles PlaybackOutcome::Cancelled;
            }

            if let Err(err) = backend.inject(&event.kind, event.position) {
                tracing::error!(
                    "Playback {} injection failed after {} events: {}",
                    session.id,
                    events_injected,
                    err
                );
                break 'cycles PlaybackOutcome::Failed(err.into());
            }
            events_injected += 1;

            if events_injected % progress_every == 0 {
                publish_progress(notifier, session, cycle, events_injected);
            }
        }

        cycle += 1;
        if events_injected % progress_every != 0 {
            publish_progress(notifier, session, cycle - 1, events_injected);
        }

        if !session.loop_playback {
            break PlaybackOutcome::Completed;
        }
        tracing::debug!("Playback {} finished cycle {}", session.id, cycle);
    };

    tracing::info!(
        "Playback {} stopped ({:?}, injected={}, cycles={})",
        session.id,
        outcome,
        events_injected,
        cycle
    );

    PlaybackReport {
        outcome,
        events_injected,
        cycles_completed: cycle,
    }
}

/// Sleep until `deadline` in slices of at most `slice`, checking `cancel`
/// before each one. Returns `false` if cancelled.
fn sleep_until(deadline: Instant, cancel: &AtomicBool, slice: Duration) -> bool {
    let slice = slice.max(Duration::from_millis(1));
    loop {
        if cancel.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(slice));
    }
}

fn publish_progress(
    notifier: &EventNotifier,
    session: &PlaybackSession,
    cycle: u64,
    events_injected: u64,
) {
    notifier.publish(EngineNotification::PlaybackProgress(PlaybackProgress {
        session_id: session.id,
        cycle,
        events_injected,
        events_per_cycle: session.recording.len(),
    }));
}
