use crate::capture::traits::{HookHandle, InputBackend};
use crate::engine::error::{EngineError, EngineResult};
use crate::playback::notifier::{EngineNotification, EventNotifier};
use crate::recorder::store::RecordingSink;
use parking_lot::Mutex as ParkingMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Global pointer listener.
///
/// Installs the backend hook and feeds each delivery into the open
/// recording. The hook callback only stamps and pushes onto the recording
/// buffer; no other work happens on the OS delivery path.
pub struct InputListener {
    backend: Arc<dyn InputBackend>,
    is_listening: AtomicBool,
    hook: ParkingMutex<Option<Box<dyn HookHandle>>>,
    captured: Arc<AtomicU64>,
}

impl InputListener {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self {
            backend,
            is_listening: AtomicBool::new(false),
            hook: ParkingMutex::new(None),
            captured: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn ensure_permission(&self) -> EngineResult<()> {
        if self.backend.has_permission() {
            return Ok(());
        }
        Err(EngineError::PermissionDenied(format!(
            "input monitoring is not granted for the {} backend",
            self.backend.name()
        )))
    }

    /// Start delivering pointer events into `sink`.
    ///
    /// With `echo` set, every captured event is also published as a
    /// `Captured` notification.
    pub fn start(&self, sink: RecordingSink, echo: Option<EventNotifier>) -> EngineResult<()> {
        if self.is_listening.load(Ordering::SeqCst) {
            return Err(EngineError::AlreadyActive("mouse listener"));
        }
        self.ensure_permission()?;

        let captured = self.captured.clone();
        captured.store(0, Ordering::SeqCst);

        let handle = self.backend.start_hook(Box::new(move |kind, position| {
            if let Some(event) = sink.record(kind, position) {
                captured.fetch_add(1, Ordering::Relaxed);
                if let Some(notifier) = &echo {
                    notifier.publish(EngineNotification::Captured { event });
                }
            }
        }))?;

        *self.hook.lock() = Some(handle);
        self.is_listening.store(true, Ordering::SeqCst);

        tracing::info!("Mouse listener started (backend={})", self.backend.name());
        Ok(())
    }

    /// Unsubscribe from the OS hook and wait for it to drain.
    pub fn stop(&self) -> EngineResult<()> {
        if !self.is_listening.swap(false, Ordering::SeqCst) {
            return Err(EngineError::NotActive("mouse listener"));
        }

        if let Some(handle) = self.hook.lock().take() {
            handle.stop()?;
        }

        tracing::info!(
            "Mouse listener stopped (captured={})",
            self.captured.load(Ordering::SeqCst)
        );
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.is_listening.load(Ordering::SeqCst)
    }

    /// Events delivered since the last `start`
    pub fn captured_count(&self) -> u64 {
        self.captured.load(Ordering::SeqCst)
    }
}
