//! Engine controller
//!
//! The one owner of engine state. Every state-changing command takes the
//! command lock, checks the transition table, drives the listener or the
//! scheduler, and publishes the resulting state change. Reads of the current
//! mode go through an atomic and never wait on the lock.

use crate::capture::input::listener::InputListener;
use crate::capture::input::types::Recording;
use crate::capture::traits::InputBackend;
use crate::config::EngineConfig;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::state::{transition, EngineCommand, EngineMode, EngineStatus, RecordingSummary};
use crate::playback::notifier::{
    EngineNotification, EventNotifier, PlaybackEndReason, PlaybackEnded,
};
use crate::playback::scheduler::{
    PlaybackOutcome, PlaybackReport, PlaybackScheduler, PlaybackSession, ScheduledPlayback,
};
use crate::recorder::store::RecordingStore;
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot, Mutex};
use uuid::Uuid;

/// State guarded by the command lock
#[derive(Default)]
struct CommandSlot {
    playback: Option<ScheduledPlayback>,
}

struct EngineShared {
    backend: Arc<dyn InputBackend>,
    config: EngineConfig,
    store: RecordingStore,
    listener: InputListener,
    notifier: EventNotifier,
    mode: AtomicU8,
    /// Loop flag of the running playback, readable without the command lock
    loop_playback: ParkingMutex<Option<bool>>,
    commands: Mutex<CommandSlot>,
}

/// Process-wide engine handle. Cloning shares the same engine.
#[derive(Clone)]
pub struct EngineController {
    shared: Arc<EngineShared>,
}

impl EngineController {
    pub fn new(backend: Arc<dyn InputBackend>, config: EngineConfig) -> Self {
        let config = config.normalized();
        let notifier = EventNotifier::new(config.notification_capacity);

        tracing::info!("Engine created (backend={})", backend.name());

        Self {
            shared: Arc::new(EngineShared {
                listener: InputListener::new(backend.clone()),
                backend,
                config,
                store: RecordingStore::new(),
                notifier,
                mode: AtomicU8::new(EngineMode::Idle.as_u8()),
                loop_playback: ParkingMutex::new(None),
                commands: Mutex::new(CommandSlot::default()),
            }),
        }
    }

    /// Current mode; never blocks
    pub fn state(&self) -> EngineMode {
        EngineMode::from_u8(self.shared.mode.load(Ordering::SeqCst))
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            mode: self.state(),
            event_count: self.shared.store.len(),
            duration_ms: self.shared.store.duration().as_millis() as u64,
            loop_playback: *self.shared.loop_playback.lock(),
        }
    }

    /// The finished recording, if there is one
    pub fn recording(&self) -> Option<Recording> {
        self.shared.store.snapshot().ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotification> {
        self.shared.notifier.subscribe()
    }

    pub fn notifier(&self) -> &EventNotifier {
        &self.shared.notifier
    }

    pub fn has_permission(&self) -> bool {
        self.shared.backend.has_permission()
    }

    pub fn request_permission(&self) -> bool {
        let granted = self.shared.backend.request_permission();
        tracing::info!("Input permission requested (granted={})", granted);
        granted
    }

    /// Begin capturing into a fresh recording.
    pub async fn start_mouse_listener(&self) -> EngineResult<()> {
        let _slot = self.shared.commands.lock().await;
        self.check(EngineCommand::StartMouseListener)?;

        // Before begin_new, so a denied start keeps the armed recording.
        self.shared.listener.ensure_permission()?;

        let sink = self.shared.store.begin_new()?;
        let echo = self
            .shared
            .config
            .echo_captured_events
            .then(|| self.shared.notifier.clone());

        if let Err(err) = self.shared.listener.start(sink, echo) {
            // Mode is still Idle or Armed; put the replaced recording back.
            let restored = self.shared.store.abort_capture();
            tracing::warn!(
                "Failed to start mouse listener: {} (kept {} recorded events)",
                err,
                restored
            );
            return Err(err);
        }

        self.set_mode(EngineMode::Recording);
        Ok(())
    }

    /// End capture. Arms the recording if anything was captured.
    pub async fn stop_mouse_listener(&self) -> EngineResult<RecordingSummary> {
        let _slot = self.shared.commands.lock().await;
        self.check(EngineCommand::StopMouseListener)?;
        self.stop_listener_locked().await
    }

    /// Discard the armed recording.
    pub async fn clear_playback_queue(&self) -> EngineResult<()> {
        let _slot = self.shared.commands.lock().await;
        self.check(EngineCommand::ClearPlaybackQueue)?;

        self.shared.store.clear()?;
        tracing::info!("Playback queue cleared");
        self.set_mode(EngineMode::Idle);
        Ok(())
    }

    /// Start replaying the armed recording. Returns the playback session id.
    pub async fn start_playback(&self, loop_playback: bool) -> EngineResult<Uuid> {
        let mut slot = self.shared.commands.lock().await;
        self.check(EngineCommand::StartPlayback)?;

        let recording = self.shared.store.snapshot()?;
        let session = PlaybackSession::new(recording, loop_playback);
        let session_id = session.id;
        let (done_tx, done_rx) = oneshot::channel();

        self.shared.store.set_replaying(true);
        let scheduled = match PlaybackScheduler::start(
            session,
            self.shared.backend.clone(),
            self.shared.notifier.clone(),
            self.shared.config.scheduler_options(),
            done_tx,
        ) {
            Ok(scheduled) => scheduled,
            Err(err) => {
                self.shared.store.set_replaying(false);
                return Err(EngineError::Platform(format!(
                    "failed to spawn playback thread: {}",
                    err
                )));
            }
        };

        slot.playback = Some(scheduled);
        *self.shared.loop_playback.lock() = Some(loop_playback);
        self.set_mode(EngineMode::Playing);

        let controller = self.clone();
        tokio::spawn(async move {
            // A dropped sender means the thread died; reap it all the same.
            let _ = done_rx.await;
            controller.reap_playback(session_id).await;
        });

        Ok(session_id)
    }

    /// Cancel the running playback and wait for its thread to exit.
    pub async fn stop_playback(&self) -> EngineResult<()> {
        let mut slot = self.shared.commands.lock().await;
        self.check(EngineCommand::StopPlayback)?;

        let scheduled = slot
            .playback
            .take()
            .ok_or(EngineError::NotActive("playback"))?;
        scheduled.cancel();
        self.finish_playback(scheduled).await;
        Ok(())
    }

    /// Stop whichever background context is running.
    pub async fn shutdown(&self) {
        let mut slot = self.shared.commands.lock().await;
        match self.state() {
            EngineMode::Recording => {
                if let Err(err) = self.stop_listener_locked().await {
                    tracing::warn!("Error stopping listener during shutdown: {}", err);
                }
            }
            EngineMode::Playing => {
                if let Some(scheduled) = slot.playback.take() {
                    scheduled.cancel();
                    self.finish_playback(scheduled).await;
                }
            }
            EngineMode::Idle | EngineMode::Armed => {}
        }
        tracing::info!("Engine shut down");
    }

    fn check(&self, command: EngineCommand) -> EngineResult<EngineMode> {
        let from = self.state();
        transition(from, command).map_err(|err| {
            tracing::debug!("Rejected {} in {}: {}", command, from, err);
            err
        })
    }

    fn set_mode(&self, to: EngineMode) {
        let from = EngineMode::from_u8(self.shared.mode.swap(to.as_u8(), Ordering::SeqCst));
        if from != to {
            tracing::info!("Engine state {} -> {}", from, to);
            self.shared
                .notifier
                .publish(EngineNotification::StateChanged { from, to });
        }
    }

    /// Caller holds the command lock.
    async fn stop_listener_locked(&self) -> EngineResult<RecordingSummary> {
        let shared = self.shared.clone();
        let stopped = tokio::task::spawn_blocking(move || shared.listener.stop())
            .await
            .map_err(|err| EngineError::Platform(format!("listener stop task failed: {}", err)))
            .and_then(|result| result);

        let event_count = self.shared.store.finish_capture();
        let summary = RecordingSummary {
            event_count,
            duration_ms: self.shared.store.duration().as_millis() as u64,
        };
        self.set_mode(if event_count > 0 {
            EngineMode::Armed
        } else {
            EngineMode::Idle
        });

        tracing::info!(
            "Recording finished (events={}, duration={}ms)",
            summary.event_count,
            summary.duration_ms
        );
        stopped.map(|_| summary)
    }

    /// Natural end of a playback: take it if it is still the active one.
    async fn reap_playback(&self, session_id: Uuid) {
        let mut slot = self.shared.commands.lock().await;
        let is_current = slot
            .playback
            .as_ref()
            .is_some_and(|p| p.session_id == session_id);
        if !is_current {
            return;
        }
        if let Some(scheduled) = slot.playback.take() {
            self.finish_playback(scheduled).await;
        }
    }

    /// Join the replay thread, re-arm, then announce the end. Caller holds the
    /// command lock and has already taken `scheduled` out of the slot, which
    /// is what makes the end notification fire once.
    async fn finish_playback(&self, scheduled: ScheduledPlayback) {
        let session_id = scheduled.session_id;
        let report = tokio::task::spawn_blocking(move || scheduled.join())
            .await
            .unwrap_or_else(|err| PlaybackReport {
                outcome: PlaybackOutcome::Failed(EngineError::Platform(format!(
                    "playback join failed: {}",
                    err
                ))),
                events_injected: 0,
                cycles_completed: 0,
            });

        self.shared.store.set_replaying(false);
        *self.shared.loop_playback.lock() = None;
        self.set_mode(EngineMode::Armed);

        let reason = match report.outcome {
            PlaybackOutcome::Completed => PlaybackEndReason::Completed,
            PlaybackOutcome::Cancelled => PlaybackEndReason::Cancelled,
            PlaybackOutcome::Failed(error) => PlaybackEndReason::Failed { error },
        };
        self.shared
            .notifier
            .publish(EngineNotification::PlaybackEnded(PlaybackEnded {
                session_id,
                reason,
                events_injected: report.events_injected,
                cycles_completed: report.cycles_completed,
                ended_at: chrono::Utc::now(),
            }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::input::types::{InputEventKind, MouseButton, Position};
    use crate::capture::mock::MockBackend;
    use crate::capture::traits::HookHandle;
    use std::time::{Duration, Instant};
    use tokio::time::timeout;

    const TOLERANCE: Duration = Duration::from_millis(30);

    fn engine(backend: &MockBackend) -> EngineController {
        let config = EngineConfig {
            cancel_poll_interval_ms: 5,
            ..EngineConfig::default()
        };
        EngineController::new(Arc::new(backend.clone()), config)
    }

    /// Record moves separated by the given gaps.
    async fn record(engine: &EngineController, backend: &MockBackend, gaps_ms: &[u64]) {
        engine.start_mouse_listener().await.unwrap();
        backend.emit(InputEventKind::Move, Position::new(0, 0));
        for (i, gap) in gaps_ms.iter().enumerate() {
            tokio::time::sleep(Duration::from_millis(*gap)).await;
            backend.emit(InputEventKind::Move, Position::new(i as i32 + 1, 0));
        }
        engine.stop_mouse_listener().await.unwrap();
    }

    async fn next_ended(
        rx: &mut broadcast::Receiver<EngineNotification>,
    ) -> PlaybackEnded {
        loop {
            let notification = timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for playback_ended")
                .unwrap();
            if let EngineNotification::PlaybackEnded(ended) = notification {
                return ended;
            }
        }
    }

    fn count_ended(rx: &mut broadcast::Receiver<EngineNotification>) -> usize {
        let mut count = 0;
        while let Ok(notification) = rx.try_recv() {
            if matches!(notification, EngineNotification::PlaybackEnded(_)) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_record_then_replay_once() {
        let backend = MockBackend::new();
        let engine = engine(&backend);

        engine.start_mouse_listener().await.unwrap();
        assert_eq!(engine.state(), EngineMode::Recording);
        backend.emit(InputEventKind::Move, Position::new(10, 10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        backend.emit(
            InputEventKind::ButtonDown {
                button: MouseButton::Left,
            },
            Position::new(10, 10),
        );
        tokio::time::sleep(Duration::from_millis(70)).await;
        backend.emit(
            InputEventKind::ButtonUp {
                button: MouseButton::Left,
            },
            Position::new(10, 10),
        );

        let summary = engine.stop_mouse_listener().await.unwrap();
        assert_eq!(summary.event_count, 3);
        assert_eq!(engine.state(), EngineMode::Armed);

        let recording = engine.recording().unwrap();
        let offsets: Vec<Duration> = recording.iter().map(|e| e.offset).collect();

        let mut rx = engine.subscribe();
        engine.start_playback(false).await.unwrap();
        let ended = next_ended(&mut rx).await;

        assert_eq!(ended.reason, PlaybackEndReason::Completed);
        assert_eq!(ended.events_injected, 3);
        assert_eq!(engine.state(), EngineMode::Armed);

        let injected = backend.injected();
        assert_eq!(injected.len(), 3);
        let kinds: Vec<InputEventKind> = injected.iter().map(|i| i.kind).collect();
        let recorded: Vec<InputEventKind> = recording.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, recorded);

        for i in 1..3 {
            let replayed_gap = injected[i].at.duration_since(injected[0].at);
            let recorded_gap = offsets[i] - offsets[0];
            let diff = if replayed_gap > recorded_gap {
                replayed_gap - recorded_gap
            } else {
                recorded_gap - replayed_gap
            };
            assert!(
                diff < TOLERANCE,
                "event {} replayed at {:?}, recorded at {:?}",
                i,
                replayed_gap,
                recorded_gap
            );
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_looping_playback_after_third_event() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        record(&engine, &backend, &[150]).await;

        let mut rx = engine.subscribe();
        engine.start_playback(true).await.unwrap();
        assert_eq!(engine.state(), EngineMode::Playing);
        assert_eq!(engine.status().loop_playback, Some(true));

        let waiter = backend.clone();
        let observed = tokio::task::spawn_blocking(move || {
            waiter.wait_for_injections(3, Duration::from_secs(5))
        })
        .await
        .unwrap();
        assert!(observed);

        engine.stop_playback().await.unwrap();
        assert_eq!(engine.state(), EngineMode::Armed);
        assert_eq!(backend.injected().len(), 3);

        let ended = next_ended(&mut rx).await;
        assert_eq!(ended.reason, PlaybackEndReason::Cancelled);
        assert_eq!(ended.cycles_completed, 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count_ended(&mut rx), 0);
        assert_eq!(backend.injected().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_returns_within_one_interval() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        record(&engine, &backend, &[400]).await;

        engine.start_playback(true).await.unwrap();
        let waiter = backend.clone();
        tokio::task::spawn_blocking(move || waiter.wait_for_injections(1, Duration::from_secs(5)))
            .await
            .unwrap();

        let started = Instant::now();
        engine.stop_playback().await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(backend.injected().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_playback_from_idle_is_empty_recording() {
        let backend = MockBackend::new();
        let engine = engine(&backend);

        assert_eq!(engine.start_playback(false).await, Err(EngineError::EmptyRecording));
        assert_eq!(engine.state(), EngineMode::Idle);
        assert!(backend.injected().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_then_playback_is_empty_recording() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        record(&engine, &backend, &[5]).await;

        engine.clear_playback_queue().await.unwrap();
        assert_eq!(engine.state(), EngineMode::Idle);
        assert!(engine.recording().is_none());
        assert_eq!(engine.start_playback(false).await, Err(EngineError::EmptyRecording));
        assert!(backend.injected().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_busy_while_recording_and_playing() {
        let backend = MockBackend::new();
        let engine = engine(&backend);

        engine.start_mouse_listener().await.unwrap();
        backend.emit(InputEventKind::Move, Position::default());
        assert!(matches!(
            engine.start_playback(false).await,
            Err(EngineError::EngineBusy { .. })
        ));
        assert!(matches!(
            engine.clear_playback_queue().await,
            Err(EngineError::EngineBusy { .. })
        ));
        assert_eq!(
            engine.start_mouse_listener().await,
            Err(EngineError::AlreadyActive("mouse listener"))
        );
        tokio::time::sleep(Duration::from_millis(300)).await;
        backend.emit(InputEventKind::Move, Position::default());
        engine.stop_mouse_listener().await.unwrap();

        engine.start_playback(false).await.unwrap();
        assert!(matches!(
            engine.start_mouse_listener().await,
            Err(EngineError::EngineBusy {
                state: EngineMode::Playing,
                command: EngineCommand::StartMouseListener,
            })
        ));
        engine.stop_playback().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_capture_returns_to_idle() {
        let backend = MockBackend::new();
        let engine = engine(&backend);

        engine.start_mouse_listener().await.unwrap();
        let summary = engine.stop_mouse_listener().await.unwrap();
        assert_eq!(summary.event_count, 0);
        assert_eq!(engine.state(), EngineMode::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_new_recording_replaces_armed_one() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        record(&engine, &backend, &[1, 1, 1]).await;
        assert_eq!(engine.status().event_count, 4);

        record(&engine, &backend, &[]).await;
        assert_eq!(engine.status().event_count, 1);
        assert_eq!(engine.state(), EngineMode::Armed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_permission_denied_keeps_armed_recording() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        record(&engine, &backend, &[1]).await;

        backend.deny_permission();
        assert!(matches!(
            engine.start_mouse_listener().await,
            Err(EngineError::PermissionDenied(_))
        ));
        assert_eq!(engine.state(), EngineMode::Armed);
        assert_eq!(engine.recording().unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_hook_install_keeps_armed_recording() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        record(&engine, &backend, &[1]).await;
        let before = engine.recording().unwrap();

        // Another hook already holds the OS event stream.
        let occupied = backend
            .start_hook(Box::new(|_: InputEventKind, _: Position| {}))
            .unwrap();

        let mut rx = engine.subscribe();
        assert!(matches!(
            engine.start_mouse_listener().await,
            Err(EngineError::Platform(_))
        ));
        assert_eq!(engine.state(), EngineMode::Armed);
        assert_eq!(engine.recording(), Some(before));
        assert!(rx.try_recv().is_err());

        occupied.stop().unwrap();
        engine.start_mouse_listener().await.unwrap();
        assert_eq!(engine.state(), EngineMode::Recording);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_injection_failure_reported_and_rearmed() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        record(&engine, &backend, &[1, 1]).await;
        backend.reject_injection_at(1);

        let mut rx = engine.subscribe();
        engine.start_playback(true).await.unwrap();
        let ended = next_ended(&mut rx).await;

        match ended.reason {
            PlaybackEndReason::Failed { error } => {
                assert_eq!(error.kind(), "injectionFailure")
            }
            other => panic!("unexpected end reason {:?}", other),
        }
        assert_eq!(ended.events_injected, 1);
        assert_eq!(engine.state(), EngineMode::Armed);
        assert_eq!(engine.stop_playback().await, Err(EngineError::NotActive("playback")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_state_changes_are_published() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        let mut rx = engine.subscribe();

        record(&engine, &backend, &[]).await;
        engine.clear_playback_queue().await.unwrap();

        let mut transitions = Vec::new();
        while let Ok(notification) = rx.try_recv() {
            if let EngineNotification::StateChanged { from, to } = notification {
                transitions.push((from, to));
            }
        }
        assert_eq!(
            transitions,
            vec![
                (EngineMode::Idle, EngineMode::Recording),
                (EngineMode::Recording, EngineMode::Armed),
                (EngineMode::Armed, EngineMode::Idle),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_stops_playback() {
        let backend = MockBackend::new();
        let engine = engine(&backend);
        record(&engine, &backend, &[100]).await;

        let mut rx = engine.subscribe();
        engine.start_playback(true).await.unwrap();
        engine.shutdown().await;

        assert_eq!(engine.state(), EngineMode::Armed);
        assert_eq!(next_ended(&mut rx).await.reason, PlaybackEndReason::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_echo_captured_events() {
        let backend = MockBackend::new();
        let config = EngineConfig {
            echo_captured_events: true,
            ..EngineConfig::default()
        };
        let engine = EngineController::new(Arc::new(backend.clone()), config);
        let mut rx = engine.subscribe();

        engine.start_mouse_listener().await.unwrap();
        backend.emit(InputEventKind::Move, Position::new(4, 2));
        engine.stop_mouse_listener().await.unwrap();

        let mut captured = Vec::new();
        while let Ok(notification) = rx.try_recv() {
            if let EngineNotification::Captured { event } = notification {
                captured.push(event.position);
            }
        }
        assert_eq!(captured, vec![Position::new(4, 2)]);
    }
}
