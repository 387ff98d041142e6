use crate::capture::input::types::{InputEventKind, MouseButton, Position, ScrollDelta};
use crate::capture::traits::{HookCallback, HookHandle, PlatformError, PlatformResult};
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    EventField,
};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// How long the tap thread's run loop runs before re-checking the stop flag
const RUN_LOOP_SLICE: Duration = Duration::from_millis(50);

const POINTER_EVENTS: [CGEventType; 11] = [
    CGEventType::MouseMoved,
    CGEventType::LeftMouseDown,
    CGEventType::LeftMouseUp,
    CGEventType::RightMouseDown,
    CGEventType::RightMouseUp,
    CGEventType::OtherMouseDown,
    CGEventType::OtherMouseUp,
    CGEventType::LeftMouseDragged,
    CGEventType::RightMouseDragged,
    CGEventType::OtherMouseDragged,
    CGEventType::ScrollWheel,
];

struct TapHandle {
    running: Arc<AtomicBool>,
    thread: std::thread::JoinHandle<()>,
}

impl HookHandle for TapHandle {
    fn stop(self: Box<Self>) -> PlatformResult<()> {
        self.running.store(false, Ordering::SeqCst);
        self.thread
            .join()
            .map_err(|_| PlatformError::HookFailed("event tap thread panicked".to_string()))
    }
}

/// Install a listen-only event tap on a dedicated run-loop thread.
pub fn start_event_tap(callback: HookCallback) -> PlatformResult<Box<dyn HookHandle>> {
    let running = Arc::new(AtomicBool::new(true));
    let (ready_tx, ready_rx) = mpsc::channel::<PlatformResult<()>>();

    let thread_running = running.clone();
    let thread = std::thread::Builder::new()
        .name("input-event-tap".to_string())
        .spawn(move || run_tap(callback, thread_running, ready_tx))
        .map_err(|e| PlatformError::HookFailed(e.to_string()))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(Box::new(TapHandle { running, thread })),
        Ok(Err(err)) => {
            let _ = thread.join();
            Err(err)
        }
        Err(_) => {
            let _ = thread.join();
            Err(PlatformError::HookFailed(
                "event tap thread exited during setup".to_string(),
            ))
        }
    }
}

fn run_tap(callback: HookCallback, running: Arc<AtomicBool>, ready: mpsc::Sender<PlatformResult<()>>) {
    let callback = RefCell::new(callback);

    let tap = CGEventTap::new(
        CGEventTapLocation::HID,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        POINTER_EVENTS.to_vec(),
        |_proxy, event_type, event: &CGEvent| {
            if let Some(kind) = translate(event_type, event) {
                let location = event.location();
                (&mut *callback.borrow_mut())(kind, Position::from_f64(location.x, location.y));
            }
            None
        },
    );

    let tap = match tap {
        Ok(tap) => tap,
        Err(()) => {
            let _ = ready.send(Err(PlatformError::PermissionDenied(
                "could not create event tap; grant Input Monitoring in System Settings"
                    .to_string(),
            )));
            return;
        }
    };

    let source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err(PlatformError::HookFailed(
                "could not create run loop source for event tap".to_string(),
            )));
            return;
        }
    };

    unsafe {
        CFRunLoop::get_current().add_source(&source, kCFRunLoopCommonModes);
    }
    tap.enable();
    let _ = ready.send(Ok(()));

    tracing::info!("macOS event tap started");

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, RUN_LOOP_SLICE, false);
        }
    }

    tracing::info!("macOS event tap stopped");
}

fn translate(event_type: CGEventType, event: &CGEvent) -> Option<InputEventKind> {
    let kind = match event_type {
        CGEventType::MouseMoved
        | CGEventType::LeftMouseDragged
        | CGEventType::RightMouseDragged
        | CGEventType::OtherMouseDragged => InputEventKind::Move,
        CGEventType::LeftMouseDown => InputEventKind::ButtonDown {
            button: MouseButton::Left,
        },
        CGEventType::LeftMouseUp => InputEventKind::ButtonUp {
            button: MouseButton::Left,
        },
        CGEventType::RightMouseDown => InputEventKind::ButtonDown {
            button: MouseButton::Right,
        },
        CGEventType::RightMouseUp => InputEventKind::ButtonUp {
            button: MouseButton::Right,
        },
        CGEventType::OtherMouseDown => InputEventKind::ButtonDown {
            button: other_button(event),
        },
        CGEventType::OtherMouseUp => InputEventKind::ButtonUp {
            button: other_button(event),
        },
        CGEventType::ScrollWheel => InputEventKind::Scroll {
            delta: ScrollDelta {
                dx: event.get_integer_value_field(EventField::SCROLL_WHEEL_EVENT_DELTA_AXIS_2) as i32,
                dy: event.get_integer_value_field(EventField::SCROLL_WHEEL_EVENT_DELTA_AXIS_1) as i32,
            },
        },
        _ => return None,
    };
    Some(kind)
}

/// Button numbers: 0 left, 1 right, 2 middle, 3+ extra
fn other_button(event: &CGEvent) -> MouseButton {
    match event.get_integer_value_field(EventField::MOUSE_EVENT_BUTTON_NUMBER) {
        2 => MouseButton::Middle,
        n => MouseButton::Other(n.clamp(0, u8::MAX as i64) as u8),
    }
}
