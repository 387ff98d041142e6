//! In-memory backend for tests

use crate::capture::input::types::{InputEventKind, Position};
use crate::capture::traits::{HookCallback, HookHandle, InputBackend, PlatformError, PlatformResult};
use parking_lot::{Condvar, Mutex as ParkingMutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedEvent {
    pub at: Instant,
    pub kind: InputEventKind,
    pub position: Position,
}

#[derive(Default)]
struct MockState {
    injected: ParkingMutex<Vec<InjectedEvent>>,
    injected_changed: Condvar,
    reject_at: ParkingMutex<Option<usize>>,
    hook: ParkingMutex<Option<HookCallback>>,
    permission_denied: AtomicBool,
}

/// Records injections and lets tests play the OS hook
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_permission(&self) {
        self.state.permission_denied.store(true, Ordering::SeqCst);
    }

    /// Reject the injection with this zero-based index
    pub fn reject_injection_at(&self, index: usize) {
        *self.state.reject_at.lock() = Some(index);
    }

    pub fn injected(&self) -> Vec<InjectedEvent> {
        self.state.injected.lock().clone()
    }

    pub fn is_hooked(&self) -> bool {
        self.state.hook.lock().is_some()
    }

    /// Deliver an event as if the OS hook observed it. Returns `false` when no
    /// hook is installed.
    pub fn emit(&self, kind: InputEventKind, position: Position) -> bool {
        match self.state.hook.lock().as_mut() {
            Some(callback) => {
                callback(kind, position);
                true
            }
            None => false,
        }
    }

    /// Wait until at least `count` events were injected. Returns `false` on
    /// timeout.
    pub fn wait_for_injections(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut injected = self.state.injected.lock();
        while injected.len() < count {
            if self
                .state
                .injected_changed
                .wait_until(&mut injected, deadline)
                .timed_out()
            {
                return injected.len() >= count;
            }
        }
        true
    }
}

struct MockHook {
    state: Arc<MockState>,
}

impl HookHandle for MockHook {
    fn stop(self: Box<Self>) -> PlatformResult<()> {
        self.state.hook.lock().take();
        Ok(())
    }
}

impl InputBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn has_permission(&self) -> bool {
        !self.state.permission_denied.load(Ordering::SeqCst)
    }

    fn request_permission(&self) -> bool {
        self.has_permission()
    }

    fn start_hook(&self, callback: HookCallback) -> PlatformResult<Box<dyn HookHandle>> {
        let mut hook = self.state.hook.lock();
        if hook.is_some() {
            return Err(PlatformError::HookFailed("hook already installed".to_string()));
        }
        *hook = Some(callback);
        Ok(Box::new(MockHook {
            state: self.state.clone(),
        }))
    }

    fn inject(&self, kind: &InputEventKind, position: Position) -> PlatformResult<()> {
        let mut injected = self.state.injected.lock();
        if *self.state.reject_at.lock() == Some(injected.len()) {
            return Err(PlatformError::InjectionRejected(
                "input grabbed by another process".to_string(),
            ));
        }
        injected.push(InjectedEvent {
            at: Instant::now(),
            kind: *kind,
            position,
        });
        self.state.injected_changed.notify_all();
        Ok(())
    }
}
