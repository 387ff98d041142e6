use crate::capture::input::types::{InputEventKind, MouseButton, Position, ScrollDelta};
use crate::capture::traits::{HookCallback, HookHandle, PlatformError, PlatformResult};
use parking_lot::Mutex as ParkingMutex;
use std::sync::mpsc;
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, PostThreadMessageW, SetWindowsHookExW, UnhookWindowsHookEx,
    HC_ACTION, HHOOK, MSG, MSLLHOOKSTRUCT, WH_MOUSE_LL, WM_LBUTTONDOWN, WM_LBUTTONUP,
    WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEHWHEEL, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_QUIT,
    WM_RBUTTONDOWN, WM_RBUTTONUP, WM_XBUTTONDOWN, WM_XBUTTONUP,
};

/// Low-level hooks are process-wide and the hook proc has no user data, so
/// the active callback lives here. Only one hook is installed at a time.
static HOOK_CALLBACK: ParkingMutex<Option<HookCallback>> = parking_lot::const_mutex(None);

struct MouseHookHandle {
    thread_id: u32,
    thread: std::thread::JoinHandle<()>,
}

impl HookHandle for MouseHookHandle {
    fn stop(self: Box<Self>) -> PlatformResult<()> {
        let posted = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
        if let Err(e) = posted {
            // The thread is gone or unreachable; free the slot so a new hook can start.
            HOOK_CALLBACK.lock().take();
            return Err(PlatformError::HookFailed(format!("failed to stop hook thread: {}", e)));
        }
        let joined = self.thread.join();
        HOOK_CALLBACK.lock().take();
        joined.map_err(|_| PlatformError::HookFailed("hook thread panicked".to_string()))
    }
}

/// Install the low-level mouse hook on a dedicated message-loop thread.
pub fn start_mouse_hook(callback: HookCallback) -> PlatformResult<Box<dyn HookHandle>> {
    {
        let mut slot = HOOK_CALLBACK.lock();
        if slot.is_some() {
            return Err(PlatformError::HookFailed("mouse hook already installed".to_string()));
        }
        *slot = Some(callback);
    }

    let (ready_tx, ready_rx) = mpsc::channel::<PlatformResult<u32>>();

    let thread = std::thread::Builder::new()
        .name("input-mouse-hook".to_string())
        .spawn(move || run_hook_thread(ready_tx))
        .map_err(|e| {
            HOOK_CALLBACK.lock().take();
            PlatformError::HookFailed(e.to_string())
        })?;

    match ready_rx.recv() {
        Ok(Ok(thread_id)) => Ok(Box::new(MouseHookHandle { thread_id, thread })),
        Ok(Err(err)) => {
            let _ = thread.join();
            HOOK_CALLBACK.lock().take();
            Err(err)
        }
        Err(_) => {
            let _ = thread.join();
            HOOK_CALLBACK.lock().take();
            Err(PlatformError::HookFailed("hook thread exited during setup".to_string()))
        }
    }
}

fn run_hook_thread(ready: mpsc::Sender<PlatformResult<u32>>) {
    unsafe {
        let module = match GetModuleHandleW(None) {
            Ok(module) => module,
            Err(e) => {
                let _ = ready.send(Err(PlatformError::HookFailed(e.to_string())));
                return;
            }
        };

        let hook = match SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), HINSTANCE::from(module), 0) {
            Ok(hook) => hook,
            Err(e) => {
                let _ = ready.send(Err(PlatformError::HookFailed(e.to_string())));
                return;
            }
        };

        let _ = ready.send(Ok(GetCurrentThreadId()));
        tracing::info!("Windows mouse hook started");

        // GetMessageW returns 0 on WM_QUIT and -1 on error
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {}

        if let Err(e) = UnhookWindowsHookEx(hook) {
            tracing::warn!("UnhookWindowsHookEx failed: {}", e);
        }
        tracing::info!("Windows mouse hook stopped");
    }
}

unsafe extern "system" fn mouse_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let info = &*(lparam.0 as *const MSLLHOOKSTRUCT);
        if let Some(kind) = translate(wparam.0 as u32, info.mouseData) {
            if let Some(callback) = HOOK_CALLBACK.lock().as_mut() {
                callback(kind, Position::new(info.pt.x, info.pt.y));
            }
        }
    }
    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

fn translate(message: u32, mouse_data: u32) -> Option<InputEventKind> {
    let high_word = (mouse_data >> 16) as u16;
    // Raw wheel units; a precision touchpad sends steps well below WHEEL_DELTA
    let wheel = high_word as i16 as i32;

    let kind = match message {
        WM_MOUSEMOVE => InputEventKind::Move,
        WM_LBUTTONDOWN => InputEventKind::ButtonDown {
            button: MouseButton::Left,
        },
        WM_LBUTTONUP => InputEventKind::ButtonUp {
            button: MouseButton::Left,
        },
        WM_RBUTTONDOWN => InputEventKind::ButtonDown {
            button: MouseButton::Right,
        },
        WM_RBUTTONUP => InputEventKind::ButtonUp {
            button: MouseButton::Right,
        },
        WM_MBUTTONDOWN => InputEventKind::ButtonDown {
            button: MouseButton::Middle,
        },
        WM_MBUTTONUP => InputEventKind::ButtonUp {
            button: MouseButton::Middle,
        },
        // XBUTTON1 = 1, XBUTTON2 = 2; numbered after left/right/middle
        WM_XBUTTONDOWN => InputEventKind::ButtonDown {
            button: MouseButton::Other(high_word as u8 + 2),
        },
        WM_XBUTTONUP => InputEventKind::ButtonUp {
            button: MouseButton::Other(high_word as u8 + 2),
        },
        WM_MOUSEWHEEL => InputEventKind::Scroll {
            delta: ScrollDelta { dx: 0, dy: wheel },
        },
        WM_MOUSEHWHEEL => InputEventKind::Scroll {
            delta: ScrollDelta { dx: wheel, dy: 0 },
        },
        _ => return None,
    };
    Some(kind)
}
