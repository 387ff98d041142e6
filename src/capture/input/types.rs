use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Screen coordinates in pixels, origin at the top-left of the main display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Round a floating-point location reported by a platform hook
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// Extra buttons, numbered the way the platform reports them
    Other(u8),
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
            MouseButton::Other(n) => write!(f, "button{}", n),
        }
    }
}

/// Wheel movement in the capturing backend's native units (positive `dy`
/// scrolls up).
///
/// Windows reports 1/120ths of a notch (`WHEEL_DELTA` is one notch), so
/// high-resolution wheels and touchpads keep their sub-notch steps. macOS and
/// X11 report whole lines. A recording replays on the backend it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScrollDelta {
    pub dx: i32,
    pub dy: i32,
}

/// What happened. The button or wheel delta only exists for the kinds that
/// carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEventKind {
    Move,
    ButtonDown { button: MouseButton },
    ButtonUp { button: MouseButton },
    Scroll { delta: ScrollDelta },
}

impl InputEventKind {
    pub fn button(&self) -> Option<MouseButton> {
        match self {
            InputEventKind::ButtonDown { button } | InputEventKind::ButtonUp { button } => {
                Some(*button)
            }
            _ => None,
        }
    }

    pub fn scroll_delta(&self) -> Option<ScrollDelta> {
        match self {
            InputEventKind::Scroll { delta } => Some(*delta),
            _ => None,
        }
    }
}

/// One captured pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    /// Time since the listening session started
    #[serde(rename = "offsetMs", with = "offset_ms")]
    pub offset: Duration,
    #[serde(flatten)]
    pub kind: InputEventKind,
    pub position: Position,
}

impl InputEvent {
    /// Stamp an event with the time elapsed since `session_start`.
    pub fn capture(kind: InputEventKind, position: Position, session_start: Instant) -> Self {
        Self {
            offset: session_start.elapsed(),
            kind,
            position,
        }
    }

    pub fn at(offset: Duration, kind: InputEventKind, position: Position) -> Self {
        Self {
            offset,
            kind,
            position,
        }
    }
}

/// A finished, immutable recording. Cloning shares the underlying events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recording {
    events: Arc<[InputEvent]>,
}

impl Recording {
    /// Build a recording from events already in capture order.
    ///
    /// Offsets that go backwards are raised to the previous offset so the
    /// sequence stays non-decreasing.
    pub fn from_events(events: Vec<InputEvent>) -> Self {
        let mut events = events;
        let mut floor = Duration::ZERO;
        for event in events.iter_mut() {
            if event.offset < floor {
                event.offset = floor;
            }
            floor = event.offset;
        }
        Self {
            events: events.into(),
        }
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Offset of the last event
    pub fn duration(&self) -> Duration {
        self.events.last().map(|e| e.offset).unwrap_or_default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InputEvent> {
        self.events.iter()
    }
}

impl Serialize for Recording {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.events.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Recording {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<InputEvent>::deserialize(deserializer).map(Recording::from_events)
    }
}

/// Serialize a `Duration` as fractional milliseconds
mod offset_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_micros() as f64 / 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        if !ms.is_finite() || ms < 0.0 {
            return Err(serde::de::Error::custom("offset must be a non-negative number"));
        }
        Ok(Duration::from_micros((ms * 1000.0).round() as u64))
    }
}
