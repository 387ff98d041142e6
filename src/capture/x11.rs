//! X11 input backend (Linux, `x11` feature)
//!
//! `rdev::listen` never returns once it is running, so a single listener
//! thread is started on first use and kept for the life of the process.
//! Hooks only swap the callback it dispatches to.

use crate::capture::input::types::{InputEventKind, MouseButton, Position, ScrollDelta};
use crate::capture::traits::{HookCallback, HookHandle, InputBackend, PlatformError, PlatformResult};
use parking_lot::Mutex as ParkingMutex;
use std::sync::Once;
use std::time::Duration;

static ACTIVE_CALLBACK: ParkingMutex<Option<HookCallback>> = parking_lot::const_mutex(None);
static LISTENER_STARTED: Once = Once::new();
static LISTENER_FAILURE: ParkingMutex<Option<String>> = parking_lot::const_mutex(None);

/// How long to wait for `rdev::listen` to fail fast (no display, no XRecord)
const LISTEN_STARTUP_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
pub struct X11InputBackend;

impl X11InputBackend {
    pub fn new() -> Self {
        Self
    }
}

struct X11Hook;

impl HookHandle for X11Hook {
    fn stop(self: Box<Self>) -> PlatformResult<()> {
        ACTIVE_CALLBACK.lock().take();
        Ok(())
    }
}

/// Start the shared listener thread once; returns the error it died with, if
/// any.
fn ensure_listener() -> Option<String> {
    let mut first_start = false;
    LISTENER_STARTED.call_once(|| {
        first_start = true;
        if let Err(e) = std::thread::Builder::new()
            .name("input-x11-listen".to_string())
            .spawn(run_listener)
        {
            *LISTENER_FAILURE.lock() = Some(e.to_string());
        }
    });
    if first_start {
        std::thread::sleep(LISTEN_STARTUP_GRACE);
    }
    LISTENER_FAILURE.lock().clone()
}

fn run_listener() {
    let mut last_position = Position::default();

    let result = rdev::listen(move |event| {
        let kind = match event.event_type {
            rdev::EventType::MouseMove { x, y } => {
                last_position = Position::from_f64(x, y);
                InputEventKind::Move
            }
            rdev::EventType::ButtonPress(button) => InputEventKind::ButtonDown {
                button: from_rdev_button(button),
            },
            rdev::EventType::ButtonRelease(button) => InputEventKind::ButtonUp {
                button: from_rdev_button(button),
            },
            rdev::EventType::Wheel { delta_x, delta_y } => InputEventKind::Scroll {
                delta: ScrollDelta {
                    dx: delta_x as i32,
                    dy: delta_y as i32,
                },
            },
            _ => return,
        };

        if let Some(callback) = ACTIVE_CALLBACK.lock().as_mut() {
            callback(kind, last_position);
        }
    });

    if let Err(err) = result {
        tracing::error!("X11 listener stopped: {:?}", err);
        *LISTENER_FAILURE.lock() = Some(format!("{:?}", err));
    }
}

fn from_rdev_button(button: rdev::Button) -> MouseButton {
    match button {
        rdev::Button::Left => MouseButton::Left,
        rdev::Button::Right => MouseButton::Right,
        rdev::Button::Middle => MouseButton::Middle,
        rdev::Button::Unknown(n) => MouseButton::Other(n),
    }
}

fn to_rdev_button(button: MouseButton) -> rdev::Button {
    match button {
        MouseButton::Left => rdev::Button::Left,
        MouseButton::Right => rdev::Button::Right,
        MouseButton::Middle => rdev::Button::Middle,
        MouseButton::Other(n) => rdev::Button::Unknown(n),
    }
}

fn simulate(event_type: &rdev::EventType) -> PlatformResult<()> {
    rdev::simulate(event_type)
        .map_err(|_| PlatformError::InjectionRejected(format!("X server rejected {:?}", event_type)))
}

impl InputBackend for X11InputBackend {
    fn name(&self) -> &'static str {
        "x11-rdev"
    }

    fn has_permission(&self) -> bool {
        std::env::var_os("DISPLAY").is_some()
    }

    fn request_permission(&self) -> bool {
        self.has_permission()
    }

    fn start_hook(&self, callback: HookCallback) -> PlatformResult<Box<dyn HookHandle>> {
        {
            let mut slot = ACTIVE_CALLBACK.lock();
            if slot.is_some() {
                return Err(PlatformError::HookFailed("X11 hook already installed".to_string()));
            }
            *slot = Some(callback);
        }

        if let Some(failure) = ensure_listener() {
            ACTIVE_CALLBACK.lock().take();
            return Err(PlatformError::HookFailed(failure));
        }
        Ok(Box::new(X11Hook))
    }

    fn inject(&self, kind: &InputEventKind, position: Position) -> PlatformResult<()> {
        simulate(&rdev::EventType::MouseMove {
            x: position.x as f64,
            y: position.y as f64,
        })?;

        match kind {
            InputEventKind::Move => Ok(()),
            InputEventKind::ButtonDown { button } => {
                simulate(&rdev::EventType::ButtonPress(to_rdev_button(*button)))
            }
            InputEventKind::ButtonUp { button } => {
                simulate(&rdev::EventType::ButtonRelease(to_rdev_button(*button)))
            }
            InputEventKind::Scroll { delta } => simulate(&rdev::EventType::Wheel {
                delta_x: delta.dx as i64,
                delta_y: delta.dy as i64,
            }),
        }
    }
}
