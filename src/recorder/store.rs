//! Recording store
//!
//! Owns the single live recording. While capture is open the listener holds a
//! `RecordingSink`, which is the only way to append. Once capture closes the
//! buffer is frozen until the next `begin_new` or `clear`.

use crate::capture::input::types::{InputEvent, InputEventKind, Position, Recording};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::state::{EngineCommand, EngineMode};
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct RecordingStore {
    events: Arc<ParkingMutex<Vec<InputEvent>>>,
    capturing: Arc<AtomicBool>,
    replaying: AtomicBool,
    /// Frozen copy handed to playback, rebuilt lazily after capture
    sealed: ParkingMutex<Option<Recording>>,
    /// Recording replaced by the open capture, put back if it is aborted
    displaced: ParkingMutex<Option<Vec<InputEvent>>>,
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            events: Arc::new(ParkingMutex::new(Vec::new())),
            capturing: Arc::new(AtomicBool::new(false)),
            replaying: AtomicBool::new(false),
            sealed: ParkingMutex::new(None),
            displaced: ParkingMutex::new(None),
        }
    }

    /// Open a fresh recording for capture. The current one is kept aside
    /// until the capture is finished or aborted.
    pub fn begin_new(&self) -> EngineResult<RecordingSink> {
        self.ensure_inactive(EngineCommand::StartMouseListener)?;

        let previous = std::mem::take(&mut *self.events.lock());
        *self.displaced.lock() = Some(previous);
        *self.sealed.lock() = None;
        self.capturing.store(true, Ordering::SeqCst);

        Ok(RecordingSink {
            events: self.events.clone(),
            capturing: self.capturing.clone(),
            session_start: Instant::now(),
        })
    }

    /// Close capture and return the number of events captured.
    ///
    /// Sinks still held by a draining hook stop appending from here on.
    pub fn finish_capture(&self) -> usize {
        self.capturing.store(false, Ordering::SeqCst);
        let events = self.events.lock().clone();
        let count = events.len();
        *self.sealed.lock() = Some(Recording::from_events(events));
        self.displaced.lock().take();
        count
    }

    /// Close capture without keeping it and restore the recording that
    /// `begin_new` replaced. Returns the restored event count.
    pub fn abort_capture(&self) -> usize {
        self.capturing.store(false, Ordering::SeqCst);
        let previous = self.displaced.lock().take().unwrap_or_default();
        let count = previous.len();
        *self.events.lock() = previous;
        *self.sealed.lock() = None;
        count
    }

    /// Empty the current recording.
    pub fn clear(&self) -> EngineResult<()> {
        self.ensure_inactive(EngineCommand::ClearPlaybackQueue)?;
        self.events.lock().clear();
        *self.sealed.lock() = None;
        Ok(())
    }

    /// Read-only view of the recording for playback.
    pub fn snapshot(&self) -> EngineResult<Recording> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(EngineError::EngineBusy {
                state: EngineMode::Recording,
                command: EngineCommand::StartPlayback,
            });
        }

        let mut sealed = self.sealed.lock();
        let recording = match sealed.as_ref() {
            Some(recording) => recording.clone(),
            None => {
                let recording = Recording::from_events(self.events.lock().clone());
                *sealed = Some(recording.clone());
                recording
            }
        };

        if recording.is_empty() {
            return Err(EngineError::EmptyRecording);
        }
        Ok(recording)
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Offset of the newest event
    pub fn duration(&self) -> Duration {
        self.events.lock().last().map(|e| e.offset).unwrap_or_default()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    pub(crate) fn set_replaying(&self, replaying: bool) {
        self.replaying.store(replaying, Ordering::SeqCst);
    }

    fn ensure_inactive(&self, command: EngineCommand) -> EngineResult<()> {
        let state = if self.capturing.load(Ordering::SeqCst) {
            EngineMode::Recording
        } else if self.replaying.load(Ordering::SeqCst) {
            EngineMode::Playing
        } else {
            return Ok(());
        };
        Err(EngineError::EngineBusy { state, command })
    }
}

/// Append-only handle given to the listener for one capture session
#[derive(Clone)]
pub struct RecordingSink {
    events: Arc<ParkingMutex<Vec<InputEvent>>>,
    capturing: Arc<AtomicBool>,
    session_start: Instant,
}

impl RecordingSink {
    /// Stamp and append an event. Returns `None` once capture has closed.
    ///
    /// The offset is taken under the buffer lock so capture order and offset
    /// order always agree.
    pub fn record(&self, kind: InputEventKind, position: Position) -> Option<InputEvent> {
        let mut events = self.events.lock();
        if !self.capturing.load(Ordering::SeqCst) {
            return None;
        }
        let mut event = InputEvent::capture(kind, position, self.session_start);
        if let Some(last) = events.last() {
            event.offset = event.offset.max(last.offset);
        }
        events.push(event);
        Some(event)
    }

    /// Append a pre-stamped event, raising its offset if it would go backwards.
    #[cfg(test)]
    pub fn append(&self, mut event: InputEvent) -> bool {
        let mut events = self.events.lock();
        if !self.capturing.load(Ordering::SeqCst) {
            tracing::trace!("Dropping event appended after capture closed");
            return false;
        }
        if let Some(last) = events.last() {
            if event.offset < last.offset {
                event.offset = last.offset;
            }
        }
        events.push(event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> InputEvent {
        InputEvent::at(Duration::from_millis(ms), InputEventKind::Move, Position::new(0, 0))
    }

    #[test]
    fn test_snapshot_of_empty_store_fails() {
        let store = RecordingStore::new();
        assert_eq!(store.snapshot(), Err(EngineError::EmptyRecording));
    }

    #[test]
    fn test_capture_then_snapshot() {
        let store = RecordingStore::new();
        let sink = store.begin_new().unwrap();
        assert!(sink.append(at(0)));
        assert!(sink.append(at(50)));
        assert!(sink.record(InputEventKind::Move, Position::new(3, 4)).is_some());
        assert_eq!(store.finish_capture(), 3);

        let recording = store.snapshot().unwrap();
        assert_eq!(recording.len(), 3);
        assert_eq!(recording.events()[2].position, Position::new(3, 4));
    }

    #[test]
    fn test_append_after_capture_closed_is_dropped() {
        let store = RecordingStore::new();
        let sink = store.begin_new().unwrap();
        sink.append(at(0));
        store.finish_capture();

        assert!(!sink.append(at(10)));
        assert!(sink.record(InputEventKind::Move, Position::default()).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_raises_backwards_offsets() {
        let store = RecordingStore::new();
        let sink = store.begin_new().unwrap();
        sink.append(at(40));
        sink.append(at(10));
        store.finish_capture();

        let offsets: Vec<Duration> = store.snapshot().unwrap().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![Duration::from_millis(40), Duration::from_millis(40)]);
    }

    #[test]
    fn test_clear_rejected_while_busy() {
        let store = RecordingStore::new();
        let _sink = store.begin_new().unwrap();
        assert!(matches!(
            store.clear(),
            Err(EngineError::EngineBusy {
                state: EngineMode::Recording,
                ..
            })
        ));
        store.finish_capture();

        store.set_replaying(true);
        assert!(matches!(
            store.clear(),
            Err(EngineError::EngineBusy {
                state: EngineMode::Playing,
                ..
            })
        ));
        store.set_replaying(false);
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_begin_new_discards_previous_recording() {
        let store = RecordingStore::new();
        let sink = store.begin_new().unwrap();
        sink.append(at(0));
        store.finish_capture();
        assert_eq!(store.len(), 1);

        let _sink = store.begin_new().unwrap();
        assert!(store.is_empty());
        assert!(store.is_capturing());
    }

    #[test]
    fn test_abort_capture_restores_previous_recording() {
        let store = RecordingStore::new();
        let sink = store.begin_new().unwrap();
        sink.append(at(0));
        sink.append(at(30));
        store.finish_capture();

        let sink = store.begin_new().unwrap();
        sink.append(at(5));
        assert_eq!(store.abort_capture(), 2);
        assert!(!store.is_capturing());
        assert!(sink.record(InputEventKind::Move, Position::default()).is_none());

        let recording = store.snapshot().unwrap();
        let offsets: Vec<Duration> = recording.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![Duration::from_millis(0), Duration::from_millis(30)]);
    }

    #[test]
    fn test_abort_first_capture_leaves_store_empty() {
        let store = RecordingStore::new();
        let _sink = store.begin_new().unwrap();
        assert_eq!(store.abort_capture(), 0);
        assert_eq!(store.snapshot(), Err(EngineError::EmptyRecording));
    }

    #[test]
    fn test_clear_then_snapshot_is_empty() {
        let store = RecordingStore::new();
        let sink = store.begin_new().unwrap();
        sink.append(at(0));
        store.finish_capture();
        store.clear().unwrap();
        assert_eq!(store.snapshot(), Err(EngineError::EmptyRecording));
    }
}
