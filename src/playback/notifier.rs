//! Event notifier
//!
//! Single producer, many consumers, fire-and-forget. Built on a tokio
//! broadcast channel: publishing never blocks, and a consumer that falls more
//! than `capacity` notifications behind loses the oldest ones.

use crate::capture::input::types::InputEvent;
use crate::engine::error::EngineError;
use crate::engine::state::EngineMode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex as ParkingMutex;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Heartbeat published while a playback runs.
///
/// Emitted every `progress_interval_events` injected events and once at the
/// end of every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackProgress {
    pub session_id: Uuid,
    /// Zero-based cycle currently being replayed
    pub cycle: u64,
    /// Total events injected in this session so far
    pub events_injected: u64,
    pub events_per_cycle: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlaybackEndReason {
    /// A non-looping run replayed every event
    Completed,
    /// `stop_playback` or shutdown
    Cancelled,
    /// Injection was refused or the replay thread died
    Failed { error: EngineError },
}

/// Published exactly once per playback session, after the replay thread has
/// been joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackEnded {
    pub session_id: Uuid,
    pub reason: PlaybackEndReason,
    pub events_injected: u64,
    pub cycles_completed: u64,
    pub ended_at: DateTime<Utc>,
}

/// Everything the engine publishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineNotification {
    PlaybackProgress(PlaybackProgress),
    PlaybackEnded(PlaybackEnded),
    StateChanged { from: EngineMode, to: EngineMode },
    Captured { event: InputEvent },
}

impl EngineNotification {
    /// Event name used when forwarding to the presentation layer
    pub fn topic(&self) -> &'static str {
        match self {
            EngineNotification::PlaybackProgress(_) => "playback_events",
            EngineNotification::PlaybackEnded(_) => "playback_ended",
            EngineNotification::StateChanged { .. } => "engine_state",
            EngineNotification::Captured { .. } => "captured_events",
        }
    }
}

/// A consumer that notifications can be forwarded to
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Deliver one notification. Return `false` to stop forwarding.
    async fn deliver(&self, notification: EngineNotification) -> bool;
}

#[derive(Clone)]
pub struct EventNotifier {
    tx: broadcast::Sender<EngineNotification>,
}

impl EventNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish without waiting. Having no subscribers is fine.
    pub fn publish(&self, notification: EngineNotification) {
        if self.tx.send(notification).is_err() {
            tracing::trace!("Notification dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineNotification> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Spawn a task that pushes every notification into `sink` until the sink
    /// declines or the notifier is dropped.
    pub fn forward<S: NotificationSink>(&self, sink: S) -> JoinHandle<()> {
        tokio::spawn(pump(self.subscribe(), sink))
    }
}

/// Forwarding tasks keyed by consumer. Forwarding again under a key aborts
/// the task already registered for it, so a reloaded webview does not stack
/// forwarders.
#[derive(Default)]
pub struct ForwarderRegistry {
    tasks: ParkingMutex<HashMap<String, JoinHandle<()>>>,
}

impl ForwarderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start forwarding `notifier` into `sink` on behalf of `key`.
    pub fn forward<S: NotificationSink>(&self, key: impl Into<String>, notifier: &EventNotifier, sink: S) {
        let key = key.into();
        let handle = notifier.forward(sink);

        let mut tasks = self.tasks.lock();
        tasks.retain(|_, task| !task.is_finished());
        if let Some(previous) = tasks.insert(key.clone(), handle) {
            tracing::debug!("Replacing notification forwarder for {}", key);
            previous.abort();
        }
    }

    /// Stop every forwarder.
    pub fn abort_all(&self) {
        for (_, task) in self.tasks.lock().drain() {
            task.abort();
        }
    }

    #[cfg(test)]
    fn running(&self) -> usize {
        self.tasks.lock().values().filter(|task| !task.is_finished()).count()
    }
}

/// Drain `rx` into `sink`. Lagging only loses the skipped notifications.
pub async fn pump<S: NotificationSink>(mut rx: broadcast::Receiver<EngineNotification>, sink: S) {
    loop {
        match rx.recv().await {
            Ok(notification) => {
                if !sink.deliver(notification).await {
                    tracing::debug!("Notification sink closed");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Notification consumer lagged, skipped {}", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
