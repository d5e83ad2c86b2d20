//! Collaborator seams between the drawing core and its host.
//!
//! The core never renders.  It spawns and toggles point handles, asks for
//! zoom steps and updates the two hand indicators through these traits,
//! and polls the host's colour picker and clear button once per tick.

use super::machine::ProcessState;

// ── Handles and colours ────────────────────────────────────

/// Opaque host-side handle for one rendered point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointHandle(pub u64);

/// Stroke colours offered by the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Black,
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::White => "white",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Purple => "purple",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "black" => Some(Self::Black),
            "white" => Some(Self::White),
            "red" => Some(Self::Red),
            "green" => Some(Self::Green),
            "blue" => Some(Self::Blue),
            "yellow" => Some(Self::Yellow),
            "purple" => Some(Self::Purple),
            _ => None,
        }
    }
}

/// Cooldown state shown alongside the stroke-hand indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorFlags {
    pub undo_cooling: bool,
    pub redo_cooling: bool,
}

// ── Traits ─────────────────────────────────────────────────

/// Renders points and the segments between them.
pub trait PointSink {
    fn spawn_point(&mut self, position: [f32; 3]) -> PointHandle;
    fn set_active(&mut self, handle: PointHandle, active: bool);
    fn connect(&mut self, from: PointHandle, to: PointHandle, color: Color);
}

/// Moves the camera.
pub trait ZoomActuator {
    fn zoom_in(&mut self);
    fn zoom_out(&mut self);
}

/// Per-hand state indicators.
pub trait IndicatorSink {
    fn set_right_indicator(&mut self, state: ProcessState, flags: IndicatorFlags);
    fn set_left_indicator(&mut self, state: ProcessState);
}

/// Host UI controls polled once per tick.
pub trait ControlSource {
    /// Colour picked since the last poll, if any.
    fn selected_color(&mut self) -> Option<Color>;
    /// Whether the user asked to clear the canvas since the last poll.
    fn take_clear_request(&mut self) -> bool;
}

/// Everything the application context needs from its host.
pub trait CanvasHost: PointSink + ZoomActuator + IndicatorSink + ControlSource {}

impl<T: PointSink + ZoomActuator + IndicatorSink + ControlSource> CanvasHost for T {}

// ── Recording sink ─────────────────────────────────────────

/// One collaborator call, as recorded by `RecordingSink`.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Spawn {
        handle: PointHandle,
        position: [f32; 3],
    },
    SetActive {
        handle: PointHandle,
        active: bool,
    },
    Connect {
        from: PointHandle,
        to: PointHandle,
        color: Color,
    },
    ZoomIn,
    ZoomOut,
    RightIndicator {
        state: ProcessState,
        flags: IndicatorFlags,
    },
    LeftIndicator {
        state: ProcessState,
    },
}

impl SinkEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::SetActive { .. } => "set-active",
            Self::Connect { .. } => "connect",
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
            Self::RightIndicator { .. } => "right-indicator",
            Self::LeftIndicator { .. } => "left-indicator",
        }
    }

    /// Event fields as `(key, value)` pairs of s-expression text.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let bool_str = |b: bool| (if b { "t" } else { "nil" }).to_string();
        match self {
            Self::Spawn { handle, position } => vec![
                ("handle", handle.0.to_string()),
                (
                    "position",
                    format!("({:.4} {:.4} {:.4})", position[0], position[1], position[2]),
                ),
            ],
            Self::SetActive { handle, active } => vec![
                ("handle", handle.0.to_string()),
                ("active", bool_str(*active)),
            ],
            Self::Connect { from, to, color } => vec![
                ("from", from.0.to_string()),
                ("to", to.0.to_string()),
                ("color", format!(":{}", color.as_str())),
            ],
            Self::ZoomIn | Self::ZoomOut => Vec::new(),
            Self::RightIndicator { state, flags } => vec![
                ("state", format!(":{}", state.as_str())),
                ("undo-cooling", bool_str(flags.undo_cooling)),
                ("redo-cooling", bool_str(flags.redo_cooling)),
            ],
            Self::LeftIndicator { state } => vec![("state", format!(":{}", state.as_str()))],
        }
    }
}

/// Host stand-in that records every call and serves queued controls.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<SinkEvent>,
    next_handle: u64,
    pending_color: Option<Color>,
    clear_requested: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Take all recorded events.
    pub fn drain(&mut self) -> Vec<SinkEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queue a palette pick for the next poll.
    pub fn queue_color(&mut self, color: Color) {
        self.pending_color = Some(color);
    }

    /// Queue a clear-button press for the next poll.
    pub fn queue_clear(&mut self) {
        self.clear_requested = true;
    }

    pub fn count(&self, pred: impl Fn(&SinkEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl PointSink for RecordingSink {
    fn spawn_point(&mut self, position: [f32; 3]) -> PointHandle {
        let handle = PointHandle(self.next_handle);
        self.next_handle += 1;
        self.events.push(SinkEvent::Spawn { handle, position });
        handle
    }

    fn set_active(&mut self, handle: PointHandle, active: bool) {
        self.events.push(SinkEvent::SetActive { handle, active });
    }

    fn connect(&mut self, from: PointHandle, to: PointHandle, color: Color) {
        self.events.push(SinkEvent::Connect { from, to, color });
    }
}

impl ZoomActuator for RecordingSink {
    fn zoom_in(&mut self) {
        self.events.push(SinkEvent::ZoomIn);
    }

    fn zoom_out(&mut self) {
        self.events.push(SinkEvent::ZoomOut);
    }
}

impl IndicatorSink for RecordingSink {
    fn set_right_indicator(&mut self, state: ProcessState, flags: IndicatorFlags) {
        self.events.push(SinkEvent::RightIndicator { state, flags });
    }

    fn set_left_indicator(&mut self, state: ProcessState) {
        self.events.push(SinkEvent::LeftIndicator { state });
    }
}

impl ControlSource for RecordingSink {
    fn selected_color(&mut self) -> Option<Color> {
        self.pending_color.take()
    }

    fn take_clear_request(&mut self) -> bool {
        std::mem::take(&mut self.clear_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_names_roundtrip() {
        for c in [Color::Black, Color::Red, Color::Purple] {
            assert_eq!(Color::parse(c.as_str()), Some(c));
        }
        assert_eq!(Color::parse("magenta"), None);
    }

    #[test]
    fn test_recording_sink_handles_are_sequential() {
        let mut sink = RecordingSink::new();
        let a = sink.spawn_point([0.0; 3]);
        let b = sink.spawn_point([1.0, 0.0, 0.0]);
        assert_eq!(a, PointHandle(0));
        assert_eq!(b, PointHandle(1));
        sink.connect(a, b, Color::Red);
        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.drain().len(), 3);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_controls_are_read_once() {
        let mut sink = RecordingSink::new();
        sink.queue_color(Color::Blue);
        sink.queue_clear();
        assert_eq!(sink.selected_color(), Some(Color::Blue));
        assert_eq!(sink.selected_color(), None);
        assert!(sink.take_clear_request());
        assert!(!sink.take_clear_request());
    }

    #[test]
    fn test_event_fields() {
        let ev = SinkEvent::RightIndicator {
            state: ProcessState::Undo,
            flags: IndicatorFlags {
                undo_cooling: true,
                redo_cooling: false,
            },
        };
        assert_eq!(ev.name(), "right-indicator");
        let fields = ev.fields();
        assert_eq!(fields[0], ("state", ":undo".to_string()));
        assert_eq!(fields[1], ("undo-cooling", "t".to_string()));
    }
}
