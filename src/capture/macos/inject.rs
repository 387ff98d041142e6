use crate::capture::input::types::{InputEventKind, MouseButton, Position};
use crate::capture::traits::{PlatformError, PlatformResult};
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton, EventField, ScrollEventUnit};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;

/// Post one synthetic pointer event at the HID level.
pub fn post_event(kind: &InputEventKind, position: Position) -> PlatformResult<()> {
    let point = CGPoint::new(position.x as f64, position.y as f64);

    let event = match kind {
        InputEventKind::Move => mouse_event(CGEventType::MouseMoved, point, CGMouseButton::Left)?,
        InputEventKind::ButtonDown { button } => {
            let (event_type, cg_button) = match button {
                MouseButton::Left => (CGEventType::LeftMouseDown, CGMouseButton::Left),
                MouseButton::Right => (CGEventType::RightMouseDown, CGMouseButton::Right),
                MouseButton::Middle | MouseButton::Other(_) => {
                    (CGEventType::OtherMouseDown, CGMouseButton::Center)
                }
            };
            with_button_number(mouse_event(event_type, point, cg_button)?, *button)
        }
        InputEventKind::ButtonUp { button } => {
            let (event_type, cg_button) = match button {
                MouseButton::Left => (CGEventType::LeftMouseUp, CGMouseButton::Left),
                MouseButton::Right => (CGEventType::RightMouseUp, CGMouseButton::Right),
                MouseButton::Middle | MouseButton::Other(_) => {
                    (CGEventType::OtherMouseUp, CGMouseButton::Center)
                }
            };
            with_button_number(mouse_event(event_type, point, cg_button)?, *button)
        }
        InputEventKind::Scroll { delta } => {
            let event = CGEvent::new_scroll_event(
                event_source()?,
                ScrollEventUnit::LINE,
                2,
                delta.dy,
                delta.dx,
                0,
            )
            .map_err(|_| rejected("scroll"))?;
            event.set_location(point);
            event
        }
    };

    event.post(CGEventTapLocation::HID);
    Ok(())
}

fn event_source() -> PlatformResult<CGEventSource> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|_| PlatformError::InjectionRejected("could not create event source".to_string()))
}

fn mouse_event(event_type: CGEventType, point: CGPoint, button: CGMouseButton) -> PlatformResult<CGEvent> {
    CGEvent::new_mouse_event(event_source()?, event_type, point, button)
        .map_err(|_| rejected("mouse"))
}

fn with_button_number(event: CGEvent, button: MouseButton) -> CGEvent {
    if let MouseButton::Other(number) = button {
        event.set_integer_value_field(EventField::MOUSE_EVENT_BUTTON_NUMBER, number as i64);
    }
    event
}

fn rejected(what: &str) -> PlatformError {
    PlatformError::InjectionRejected(format!(
        "could not create {} event; is Accessibility granted?",
        what
    ))
}
