use crate::capture::input::types::{InputEventKind, MouseButton, Position};
use crate::capture::traits::{PlatformError, PlatformResult};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_HWHEEL, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_RIGHTDOWN,
    MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSEEVENTF_XDOWN, MOUSEEVENTF_XUP, MOUSEINPUT,
    MOUSE_EVENT_FLAGS,
};
use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

/// Move the cursor to `position`, then send the button or wheel action.
pub fn send_input(kind: &InputEventKind, position: Position) -> PlatformResult<()> {
    unsafe {
        SetCursorPos(position.x, position.y)
            .map_err(|e| PlatformError::InjectionRejected(format!("SetCursorPos failed: {}", e)))?;
    }

    let inputs = inputs_for(kind);

    if inputs.is_empty() {
        return Ok(());
    }

    let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(PlatformError::InjectionRejected(format!(
            "SendInput accepted {} of {} events: {}",
            sent,
            inputs.len(),
            windows::core::Error::from_win32()
        )));
    }
    Ok(())
}

fn inputs_for(kind: &InputEventKind) -> Vec<INPUT> {
    let mut inputs = Vec::with_capacity(2);
    match kind {
        InputEventKind::Move => {}
        InputEventKind::ButtonDown { button } => inputs.push(button_input(*button, true)),
        InputEventKind::ButtonUp { button } => inputs.push(button_input(*button, false)),
        // Deltas are already in wheel units
        InputEventKind::Scroll { delta } => {
            if delta.dy != 0 {
                inputs.push(mouse_input(MOUSEEVENTF_WHEEL, delta.dy));
            }
            if delta.dx != 0 {
                inputs.push(mouse_input(MOUSEEVENTF_HWHEEL, delta.dx));
            }
        }
    }
    inputs
}

fn button_input(button: MouseButton, down: bool) -> INPUT {
    match (button, down) {
        (MouseButton::Left, true) => mouse_input(MOUSEEVENTF_LEFTDOWN, 0),
        (MouseButton::Left, false) => mouse_input(MOUSEEVENTF_LEFTUP, 0),
        (MouseButton::Right, true) => mouse_input(MOUSEEVENTF_RIGHTDOWN, 0),
        (MouseButton::Right, false) => mouse_input(MOUSEEVENTF_RIGHTUP, 0),
        (MouseButton::Middle, true) => mouse_input(MOUSEEVENTF_MIDDLEDOWN, 0),
        (MouseButton::Middle, false) => mouse_input(MOUSEEVENTF_MIDDLEUP, 0),
        // Other(3) is XBUTTON1, Other(4) is XBUTTON2
        (MouseButton::Other(n), true) => mouse_input(MOUSEEVENTF_XDOWN, n.saturating_sub(2) as i32),
        (MouseButton::Other(n), false) => mouse_input(MOUSEEVENTF_XUP, n.saturating_sub(2) as i32),
    }
}

fn mouse_input(flags: MOUSE_EVENT_FLAGS, data: i32) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::input::types::ScrollDelta;

    fn wheel_data(input: &INPUT) -> (MOUSE_EVENT_FLAGS, i32) {
        let mi = unsafe { input.Anonymous.mi };
        (mi.dwFlags, mi.mouseData)
    }

    #[test]
    fn test_sub_notch_scroll_is_sent_verbatim() {
        let inputs = inputs_for(&InputEventKind::Scroll {
            delta: ScrollDelta { dx: -15, dy: 40 },
        });
        assert_eq!(inputs.len(), 2);
        assert_eq!(wheel_data(&inputs[0]), (MOUSEEVENTF_WHEEL, 40));
        assert_eq!(wheel_data(&inputs[1]), (MOUSEEVENTF_HWHEEL, -15));
    }

    #[test]
    fn test_move_sends_no_extra_input() {
        assert!(inputs_for(&InputEventKind::Move).is_empty());
    }
}
